// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and hands off to
// Layer 2. Two commands are supported:
//   1. `train`    — trains the model and writes checkpoints
//   2. `evaluate` — loads the best checkpoint and reports its loss

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "tts-trainer",
    version,
    about = "Train a Transformer text-to-speech model on an LJSpeech-style corpus."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.train_metadata);

    let summary = TrainUseCase::new(args.into()).execute()?;

    if summary.stopped_early {
        println!("Stopped early: validation loss stopped improving.");
    }
    if let (Some(train), Some(val)) = (summary.train_losses.last(), summary.val_losses.last()) {
        println!("Final epoch: train loss {train:.6}, val loss {val:.6}");
    }
    match summary.best_epoch {
        Some(epoch) => println!(
            "Training complete after {} epochs. Best val loss {:.6} at epoch {}.",
            summary.epochs_run, summary.best_val_loss, epoch
        ),
        None => println!(
            "Training complete after {} epochs. No checkpoint was saved.",
            summary.epochs_run
        ),
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let report = EvaluateUseCase::new(args.checkpoint_dir, args.metadata, args.max_items).execute()?;
    println!(
        "Checkpoint epoch {}: loss {:.6} over {} utterances",
        report.epoch, report.loss, report.utterances
    );
    Ok(())
}
