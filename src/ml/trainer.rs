// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
// Per epoch:
//   1. train_epoch  — forward, loss, backward, Adam step per batch
//   2. validate     — same loss on model.valid() (no autodiff, no dropout)
//   3. record losses, metrics.csv row
//   4. checkpoint on a new best validation loss, else count patience
//   5. redraw loss_plot.png
//
// The learning rate follows StepLr. By default it steps after
// every optimizer update, so with step size 10 it halves every
// 10 batches; `lr_step_per = epoch` steps it between epochs.
//
// Key Burn insight:
//   - Training uses B (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - the validation batcher must use B::InnerBackend too
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::{dataloader::{DataLoader, DataLoaderBuilder}, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::{TtsBatch, TtsBatcher}, dataset::TtsDataset};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointState},
    metrics::{EpochMetrics, MetricsLogger},
    plot::plot_losses,
};
use crate::ml::early_stopping::{EarlyStopping, EpochOutcome};
use crate::ml::model::TransformerTts;
use crate::ml::scheduler::{LrStepPer, StepLr};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Log the running loss every this many batches
const LOG_EVERY: usize = 10;

pub const PLOT_FILE: &str = "loss_plot.png";

/// Outcome of a full training run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs_run:    usize,
    pub best_epoch:    Option<usize>,
    pub best_val_loss: f64,
    pub stopped_early: bool,
    pub train_losses:  Vec<f64>,
    pub val_losses:    Vec<f64>,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: TtsDataset,
    val_dataset:   TtsDataset,
    ckpt_manager:  CheckpointManager,
) -> Result<TrainingSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Training the data in device - {:?}", device);
    train_loop::<MyBackend>(cfg, train_dataset, val_dataset, ckpt_manager, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:              &TrainConfig,
    train_dataset:    TtsDataset,
    val_dataset:      TtsDataset,
    mut ckpt_manager: CheckpointManager,
    device:           B::Device,
) -> Result<TrainingSummary> {
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: TransformerTts<B> = cfg.model_config().init(&device);
    tracing::info!(
        "Model ready: {} encoder + {} decoder layers, d_model={}, vocab={}",
        cfg.num_layers, cfg.num_layers, cfg.d_model, cfg.vocab_size
    );

    // ── Adam optimiser + step decay ───────────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<B, TransformerTts<B>>();
    let mut scheduler = StepLr::new(cfg.lr, cfg.lr_step_size, cfg.lr_gamma);
    let mut early_stopping = EarlyStopping::new(cfg.patience);

    // ── Data loaders ──────────────────────────────────────────────────────────
    let n_train_batches = train_dataset.len().div_ceil(cfg.batch_size.max(1));

    let train_batcher = TtsBatcher::<B>::new(device.clone(), cfg.pad_id, cfg.n_mels);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    let val_batcher = TtsBatcher::<B::InnerBackend>::new(device.clone(), cfg.pad_id, cfg.n_mels);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(val_dataset);

    let metrics   = MetricsLogger::create(ckpt_manager.dir())?;
    let plot_path = ckpt_manager.dir().join(PLOT_FILE);
    tracing::info!("Logging metrics to {}", metrics.csv_path().display());

    let mut train_losses  = Vec::new();
    let mut val_losses    = Vec::new();
    let mut best_epoch    = None;
    let mut stopped_early = false;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..cfg.epochs {
        // Learning rate the epoch started with
        let lr = scheduler.lr();

        let (trained, train_loss) = train_epoch(
            model,
            &mut optim,
            &train_loader,
            &mut scheduler,
            cfg.lr_step_per,
            n_train_batches,
        );
        model = trained;

        let val_loss = validate(&model.valid(), &val_loader);
        if cfg.lr_step_per == LrStepPer::Epoch {
            scheduler.step();
        }
        tracing::debug!("Learning rate after epoch {}: {}", epoch, scheduler.lr());

        train_losses.push(train_loss);
        val_losses.push(val_loss);
        println!("Epoch - {epoch}, Train loss - {train_loss}, Val loss - {val_loss}");
        metrics.log(&EpochMetrics::new(epoch, train_loss, val_loss, lr))?;

        let outcome = early_stopping.observe(val_loss);
        match outcome {
            EpochOutcome::Improved => {
                let state = CheckpointState { epoch, train_loss, val_loss, lr };
                ckpt_manager.save_checkpoint(&model, &optim, &state)?;
                best_epoch = Some(epoch);
            }
            EpochOutcome::NoImprovement | EpochOutcome::Stop => tracing::info!(
                "No improvement for {} epoch(s), best val loss {}",
                early_stopping.epochs_without_improvement(),
                early_stopping.best_val_loss()
            ),
        }

        plot_losses(&train_losses, &val_losses, &plot_path)?;

        if outcome == EpochOutcome::Stop {
            println!("Early stopping at epoch {epoch} due to no improvement in validation loss.");
            stopped_early = true;
            break;
        }
    }

    tracing::info!("Training complete!");
    Ok(TrainingSummary {
        epochs_run: train_losses.len(),
        best_epoch,
        best_val_loss: early_stopping.best_val_loss(),
        stopped_early,
        train_losses,
        val_losses,
    })
}

/// One pass over the training data. Returns the updated model and the
/// mean batch loss (NaN when the loader yields nothing).
/// With `LrStepPer::Batch` the scheduler advances after every update.
pub fn train_epoch<B, O>(
    mut model: TransformerTts<B>,
    optim:     &mut O,
    loader:    &Arc<dyn DataLoader<TtsBatch<B>>>,
    scheduler: &mut StepLr,
    step_per:  LrStepPer,
    n_batches: usize,
) -> (TransformerTts<B>, f64)
where
    B: AutodiffBackend,
    O: Optimizer<TransformerTts<B>, B>,
{
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;

    for (batch_idx, batch) in loader.iter().enumerate() {
        let target_durations = batch.durations.clone();
        let (loss, output) = model.forward_loss(batch.phonemes, batch.mel, batch.durations);

        if batch_idx == 0 {
            tracing::info!("First sample: {:?}", batch.texts.first());
            tracing::info!(
                "Predicted durations (first sample): {:?}",
                first_row(output.durations.detach())
            );
            tracing::info!(
                "Ground truth durations (first sample): {:?}",
                first_row(target_durations)
            );
        }

        let loss_val: f64 = loss.total.clone().into_scalar().elem::<f64>();
        loss_sum += loss_val;
        batches  += 1;

        // Backward pass + Adam update
        let grads = loss.total.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(scheduler.lr(), model, grads);
        if step_per == LrStepPer::Batch {
            scheduler.step();
        }

        if (batch_idx + 1) % LOG_EVERY == 0 {
            tracing::info!(
                "Batch {}/{}, Loss: {} (spectrogram {:.6}, duration {:.6})",
                batch_idx + 1,
                n_batches,
                loss_val,
                loss.spectrogram.into_scalar().elem::<f64>(),
                loss.duration.into_scalar().elem::<f64>(),
            );
        }
    }

    let mean = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
    (model, mean)
}

/// Mean combined loss over a loader, no gradients.
pub fn validate<B: Backend>(
    model:  &TransformerTts<B>,
    loader: &Arc<dyn DataLoader<TtsBatch<B>>>,
) -> f64 {
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;

    for batch in loader.iter() {
        let (loss, _) = model.forward_loss(batch.phonemes, batch.mel, batch.durations);
        loss_sum += loss.total.into_scalar().elem::<f64>();
        batches  += 1;
    }

    if batches > 0 { loss_sum / batches as f64 } else { f64::NAN }
}

fn first_row<B: Backend>(t: Tensor<B, 2>) -> Vec<f32> {
    let [_, cols] = t.dims();
    t.slice([0..1, 0..cols])
        .into_data()
        .convert::<f32>()
        .to_vec()
        .unwrap_or_default()
}
