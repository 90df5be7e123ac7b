//! Post-norm transformer encoder block.

use burn::nn::{
    attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
    Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig,
};
use burn::prelude::*;
use burn::tensor::activation::gelu;

/// Layer norm epsilon used by both sub-block norms.
const LAYER_NORM_EPS: f64 = 1e-5;

/// One encoder block: bidirectional self-attention, then a GELU feed-forward,
/// each wrapped in a residual connection followed by layer norm.
///
/// No attention mask is applied; every step of the input window attends to
/// every other step.
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    attention: MultiHeadAttention<B>,
    norm1: LayerNorm<B>,
    ff_linear1: Linear<B>,
    ff_linear2: Linear<B>,
    norm2: LayerNorm<B>,
    dropout1: Dropout,
    dropout2: Dropout,
    ff_dropout: Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// Create a block. `d_model` must be divisible by `n_heads`.
    pub fn new(d_model: usize, n_heads: usize, d_ff: usize, dropout: f64, device: &B::Device) -> Self {
        let attention = MultiHeadAttentionConfig::new(d_model, n_heads)
            .with_dropout(dropout)
            .init(device);
        let norm1 = LayerNormConfig::new(d_model)
            .with_epsilon(LAYER_NORM_EPS)
            .init(device);
        let ff_linear1 = LinearConfig::new(d_model, d_ff).init(device);
        let ff_linear2 = LinearConfig::new(d_ff, d_model).init(device);
        let norm2 = LayerNormConfig::new(d_model)
            .with_epsilon(LAYER_NORM_EPS)
            .init(device);

        Self {
            attention,
            norm1,
            ff_linear1,
            ff_linear2,
            norm2,
            dropout1: DropoutConfig::new(dropout).init(),
            dropout2: DropoutConfig::new(dropout).init(),
            ff_dropout: DropoutConfig::new(dropout).init(),
        }
    }

    /// `[batch, len, d_model]` in and out.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn_out = self.attention.forward(MhaInput::self_attn(x.clone())).context;
        let x = self.norm1.forward(x + self.dropout1.forward(attn_out));

        let ff_out = gelu(self.ff_linear1.forward(x.clone()));
        let ff_out = self.ff_linear2.forward(self.ff_dropout.forward(ff_out));

        self.norm2.forward(x + self.dropout2.forward(ff_out))
    }
}
