use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::ml::loss::{tts_loss, TtsLoss};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerTtsConfig {
    pub vocab_size:   usize,
    pub pad_id:       usize,
    pub n_mels:       usize,
    pub max_phonemes: usize,
    pub max_frames:   usize,
    pub d_model:      usize,
    pub num_heads:    usize,
    pub num_layers:   usize,
    pub d_ff:         usize,
    #[config(default = 0.1)]
    pub dropout:      f64,
}

impl TransformerTtsConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerTts<B> {
        let phoneme_embedding  = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let phoneme_position   = EmbeddingConfig::new(self.max_phonemes, self.d_model).init(device);
        let frame_position     = EmbeddingConfig::new(self.max_frames, self.d_model).init(device);
        let encoder: Vec<AttentionBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_block(device))
            .collect();
        let decoder: Vec<AttentionBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_block(device))
            .collect();
        let encoder_norm       = LayerNormConfig::new(self.d_model).init(device);
        let decoder_norm       = LayerNormConfig::new(self.d_model).init(device);
        let duration_predictor = DurationPredictor {
            hidden:  LinearConfig::new(self.d_model, self.d_model).init(device),
            output:  LinearConfig::new(self.d_model, 1).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        };
        let mel_head           = LinearConfig::new(self.d_model, self.n_mels).init(device);
        let dropout            = DropoutConfig::new(self.dropout).init();
        TransformerTts {
            phoneme_embedding, phoneme_position, frame_position,
            encoder, decoder, encoder_norm, decoder_norm,
            duration_predictor, mel_head, dropout,
            pad_id: self.pad_id,
        }
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> AttentionBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        AttentionBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

/// Post-norm Transformer block: self-attention then GELU feed-forward.
#[derive(Module, Debug)]
pub struct AttentionBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> AttentionBlock<B> {
    /// `pad_mask` is true at padded positions, which are ignored as keys.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let input = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct DurationPredictor<B: Backend> {
    pub hidden:  Linear<B>,
    pub output:  Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> DurationPredictor<B> {
    /// [batch, phonemes, d_model] → frames per phoneme [batch, phonemes]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, num_phonemes, _] = x.dims();
        let h = burn::tensor::activation::relu(self.hidden.forward(x));
        self.output
            .forward(self.dropout.forward(h))
            .reshape([batch_size, num_phonemes])
    }
}

#[derive(Module, Debug)]
pub struct TransformerTts<B: Backend> {
    pub phoneme_embedding:  Embedding<B>,
    pub phoneme_position:   Embedding<B>,
    pub frame_position:     Embedding<B>,
    pub encoder:            Vec<AttentionBlock<B>>,
    pub decoder:            Vec<AttentionBlock<B>>,
    pub encoder_norm:       LayerNorm<B>,
    pub decoder_norm:       LayerNorm<B>,
    pub duration_predictor: DurationPredictor<B>,
    pub mel_head:           Linear<B>,
    pub dropout:            Dropout,
    pub pad_id:             usize,
}

pub struct TtsOutput<B: Backend> {
    /// Predicted mel frames [batch, frames, n_mels]
    pub mel:       Tensor<B, 3>,
    /// Predicted frames per phoneme [batch, phonemes]
    pub durations: Tensor<B, 2>,
}

impl<B: Backend> TransformerTts<B> {
    /// phonemes: [batch, P], mel: [batch, T, n_mels], durations: [batch, P].
    ///
    /// The target mel only supplies T; decoder frames come from the encoder
    /// states expanded by the ground-truth durations.
    pub fn forward(
        &self,
        phonemes:  Tensor<B, 2, Int>,
        mel:       Tensor<B, 3>,
        durations: Tensor<B, 2>,
    ) -> TtsOutput<B> {
        let [batch_size, num_phonemes] = phonemes.dims();
        let [_, num_frames, _] = mel.dims();
        let device = phonemes.device();

        // ── Encoder ───────────────────────────────────────────────────────────
        let phoneme_pad = phonemes.clone().equal_elem(self.pad_id as i64);
        let tok_emb = self.phoneme_embedding.forward(phonemes);
        let pos_emb = self.phoneme_position.forward(positions::<B>(batch_size, num_phonemes, &device));

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for block in &self.encoder {
            x = block.forward(x, phoneme_pad.clone());
        }
        let encoded = self.encoder_norm.forward(x); // [batch, P, d_model]

        let predicted_durations = self.duration_predictor.forward(encoded.clone());

        // ── Length regulator ──────────────────────────────────────────────────
        let alignment = duration_alignment(durations, num_frames); // [batch, T, P]
        let frame_pad = alignment
            .clone()
            .sum_dim(2)
            .reshape([batch_size, num_frames])
            .equal_elem(0.0);
        let expanded = alignment.matmul(encoded); // [batch, T, d_model]

        // ── Decoder ───────────────────────────────────────────────────────────
        let frame_emb = self.frame_position.forward(positions::<B>(batch_size, num_frames, &device));
        let mut y = self.dropout.forward(expanded + frame_emb);
        for block in &self.decoder {
            y = block.forward(y, frame_pad.clone());
        }
        let y = self.decoder_norm.forward(y);

        TtsOutput {
            mel:       self.mel_head.forward(y),
            durations: predicted_durations,
        }
    }

    pub fn forward_loss(
        &self,
        phonemes:  Tensor<B, 2, Int>,
        mel:       Tensor<B, 3>,
        durations: Tensor<B, 2>,
    ) -> (TtsLoss<B>, TtsOutput<B>) {
        let output = self.forward(phonemes, mel.clone(), durations.clone());
        let loss = tts_loss(output.mel.clone(), mel, output.durations.clone(), durations);
        (loss, output)
    }
}

/// [batch, len] position ids 0..len
fn positions<B: Backend>(batch_size: usize, len: usize, device: &B::Device) -> Tensor<B, 2, Int> {
    Tensor::<B, 1, Int>::arange(0..len as i64, device)
        .unsqueeze::<2>()
        .expand([batch_size, len])
}

/// Hard alignment matrix [batch, frames, phonemes]: entry (t, p) is 1 when
/// frame t falls inside phoneme p's span [start_p, start_p + d_p).
/// Frames past the total duration get an all-zero row.
pub fn duration_alignment<B: Backend>(durations: Tensor<B, 2>, num_frames: usize) -> Tensor<B, 3> {
    let [batch_size, num_phonemes] = durations.dims();
    let device = durations.device();

    // Inclusive prefix sum via an upper-triangular ones matrix
    let mut tri = vec![0.0f32; num_phonemes * num_phonemes];
    for row in 0..num_phonemes {
        for col in row..num_phonemes {
            tri[row * num_phonemes + col] = 1.0;
        }
    }
    let tri = Tensor::<B, 1>::from_floats(tri.as_slice(), &device)
        .reshape([num_phonemes, num_phonemes]);

    let ends   = durations.clone().matmul(tri);
    let starts = ends.clone() - durations;

    let shape  = [batch_size, num_frames, num_phonemes];
    let ends   = ends.reshape([batch_size, 1, num_phonemes]).expand(shape);
    let starts = starts.reshape([batch_size, 1, num_phonemes]).expand(shape);
    let frames = Tensor::<B, 1, Int>::arange(0..num_frames as i64, &device)
        .float()
        .reshape([1, num_frames, 1])
        .expand(shape);

    frames.clone().greater_equal(starts).float() * frames.lower(ends).float()
}
