// ============================================================
// Layer 5 — Training Objective
// ============================================================
//   spectrogram = 0.5 * MSE(mel) + 0.5 * L1(mel)
//   duration    = MSE(durations)
//   total       = spectrogram + 2.0 * duration
//
// All terms are means over the padded tensors, padding included.

use burn::{
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};

pub const MSE_WEIGHT: f64 = 0.5;
pub const L1_WEIGHT: f64 = 0.5;
pub const DURATION_WEIGHT: f64 = 2.0;

pub struct TtsLoss<B: Backend> {
    pub total:       Tensor<B, 1>,
    pub spectrogram: Tensor<B, 1>,
    pub duration:    Tensor<B, 1>,
}

pub fn tts_loss<B: Backend>(
    predicted_mel:       Tensor<B, 3>,
    target_mel:          Tensor<B, 3>,
    predicted_durations: Tensor<B, 2>,
    target_durations:    Tensor<B, 2>,
) -> TtsLoss<B> {
    let mse = MseLoss::new();

    let mel_mse = mse.forward(predicted_mel.clone(), target_mel.clone(), Reduction::Mean);
    let mel_l1  = (predicted_mel - target_mel).abs().mean();
    let spectrogram = mel_mse * MSE_WEIGHT + mel_l1 * L1_WEIGHT;

    let duration = mse.forward(predicted_durations, target_durations, Reduction::Mean);

    TtsLoss {
        total: spectrogram.clone() + duration.clone() * DURATION_WEIGHT,
        spectrogram,
        duration,
    }
}
