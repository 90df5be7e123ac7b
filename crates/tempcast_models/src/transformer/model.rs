//! Multi-horizon temperature forecaster.

use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use tempcast_core::{DEFAULT_OUTPUT_WINDOW, N_CHANNELS};

use super::encoder::EncoderBlock;
use super::positional::{PositionalEncoding, DEFAULT_MAX_LEN};
use crate::error::{ModelError, Result};

/// How the encoded sequence is reduced to one vector per example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Pooling {
    /// Representation of the final time step.
    #[default]
    Last,
    /// Mean over all time steps.
    Mean,
}

// Pooling is a constant (non-trainable) module field.
impl<B: Backend> burn::module::Module<B> for Pooling {
    burn::constant!(module);
}

impl<B: burn::tensor::backend::AutodiffBackend> burn::module::AutodiffModule<B> for Pooling {
    burn::constant!(ad_module, Pooling);
}

impl burn::module::ModuleDisplayDefault for Pooling {
    fn content(&self, content: burn::module::Content) -> Option<burn::module::Content> {
        content.add_formatted(&format!("{self:?}")).optional()
    }
}

impl burn::module::ModuleDisplay for Pooling {}

/// Configuration for [`TimeSeriesTransformer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSeriesTransformerConfig {
    /// Channels per time step.
    pub input_dim: usize,
    /// Embedding width.
    pub d_model: usize,
    /// Attention heads. Must divide `d_model`.
    pub nhead: usize,
    /// Encoder blocks.
    pub num_layers: usize,
    /// Feed-forward hidden width.
    pub d_ff: usize,
    /// Dropout inside attention, feed-forward and after the positional encoding.
    pub dropout: f64,
    /// Forecast horizon.
    pub output_window: usize,
    /// Rows in the positional table.
    pub max_len: usize,
    /// Sequence pooling before the head.
    pub pooling: Pooling,
}

impl Default for TimeSeriesTransformerConfig {
    fn default() -> Self {
        Self {
            input_dim: N_CHANNELS,
            d_model: 48,
            nhead: 4,
            num_layers: 1,
            d_ff: 2048,
            dropout: 0.1,
            output_window: DEFAULT_OUTPUT_WINDOW,
            max_len: DEFAULT_MAX_LEN,
            pooling: Pooling::Last,
        }
    }
}

impl TimeSeriesTransformerConfig {
    /// Create a config with the given horizon and defaults elsewhere.
    pub fn new(output_window: usize) -> Self {
        Self {
            output_window,
            ..Default::default()
        }
    }

    /// Set the embedding width.
    #[must_use]
    pub fn with_d_model(mut self, d_model: usize) -> Self {
        self.d_model = d_model;
        self
    }

    /// Set the number of heads.
    #[must_use]
    pub fn with_nhead(mut self, nhead: usize) -> Self {
        self.nhead = nhead;
        self
    }

    /// Set the number of encoder blocks.
    #[must_use]
    pub fn with_num_layers(mut self, num_layers: usize) -> Self {
        self.num_layers = num_layers;
        self
    }

    /// Set the feed-forward width.
    #[must_use]
    pub fn with_d_ff(mut self, d_ff: usize) -> Self {
        self.d_ff = d_ff;
        self
    }

    /// Set dropout.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Set the forecast horizon.
    #[must_use]
    pub fn with_output_window(mut self, output_window: usize) -> Self {
        self.output_window = output_window;
        self
    }

    /// Set the positional table length.
    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Set the pooling strategy.
    #[must_use]
    pub fn with_pooling(mut self, pooling: Pooling) -> Self {
        self.pooling = pooling;
        self
    }

    /// Check that the hyperparameters describe a buildable network.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("input_dim", self.input_dim),
            ("d_model", self.d_model),
            ("nhead", self.nhead),
            ("num_layers", self.num_layers),
            ("d_ff", self.d_ff),
            ("output_window", self.output_window),
            ("max_len", self.max_len),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ModelError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        if self.d_model % self.nhead != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "d_model ({}) must be divisible by nhead ({})",
                self.d_model, self.nhead
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    /// Validate and initialize the model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<TimeSeriesTransformer<B>> {
        self.validate()?;
        Ok(TimeSeriesTransformer::new(self, device))
    }
}

/// Transformer encoder that maps `(B, L, C)` windows to `(B, H)` forecasts.
///
/// Pipeline: per-step linear projection `C -> d_model`, sinusoidal
/// positional encoding, `num_layers` [`EncoderBlock`]s, pooling (last step
/// by default), and a linear head `d_model -> H` that emits the whole
/// horizon in one pass.
///
/// # Example
///
/// ```rust,ignore
/// let config = TimeSeriesTransformerConfig::default();
/// let model = config.init::<NdArray>(&device)?;
/// let forecast = model.forward(x)?; // [batch, 96, 4] -> [batch, 72]
/// ```
#[derive(Module, Debug)]
pub struct TimeSeriesTransformer<B: Backend> {
    input_proj: Linear<B>,
    positional: PositionalEncoding<B>,
    encoder_layers: Vec<EncoderBlock<B>>,
    head: Linear<B>,
    #[module(skip)]
    input_dim: usize,
    #[module(skip)]
    d_model: usize,
    #[module(skip)]
    output_window: usize,
    #[module(skip)]
    pooling: Pooling,
}

impl<B: Backend> TimeSeriesTransformer<B> {
    /// Create a new model. Prefer [`TimeSeriesTransformerConfig::init`], which validates.
    pub fn new(config: &TimeSeriesTransformerConfig, device: &B::Device) -> Self {
        let input_proj = LinearConfig::new(config.input_dim, config.d_model).init(device);
        let positional = PositionalEncoding::new(config.d_model, config.max_len, config.dropout, device);

        let encoder_layers = (0..config.num_layers)
            .map(|_| EncoderBlock::new(config.d_model, config.nhead, config.d_ff, config.dropout, device))
            .collect();

        let head = LinearConfig::new(config.d_model, config.output_window).init(device);

        Self {
            input_proj,
            positional,
            encoder_layers,
            head,
            input_dim: config.input_dim,
            d_model: config.d_model,
            output_window: config.output_window,
            pooling: config.pooling,
        }
    }

    /// Forecast horizon length.
    #[must_use]
    pub fn output_window(&self) -> usize {
        self.output_window
    }

    /// Longest input window the positional table supports.
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.positional.max_len()
    }

    /// Forward pass.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the channel count is wrong, the
    /// window is empty, or the window is longer than the positional table.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 2>> {
        let [batch, seq_len, channels] = x.dims();
        if channels != self.input_dim || seq_len == 0 {
            return Err(ModelError::ShapeMismatch {
                expected: format!("[batch, len > 0, {}]", self.input_dim),
                got: vec![batch, seq_len, channels],
            });
        }

        let x = self.input_proj.forward(x);
        let mut x = self.positional.forward(x)?;

        for layer in &self.encoder_layers {
            x = layer.forward(x);
        }

        let pooled = self.pool(x);
        Ok(self.head.forward(pooled))
    }

    fn pool(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, seq_len, d_model] = x.dims();
        match self.pooling {
            Pooling::Last => x
                .slice([0..batch, seq_len - 1..seq_len, 0..d_model])
                .reshape([batch, d_model]),
            Pooling::Mean => x.mean_dim(1).reshape([batch, d_model]),
        }
    }

    /// Embedding width.
    #[must_use]
    pub fn d_model(&self) -> usize {
        self.d_model
    }

    /// Pooling applied before the head.
    #[must_use]
    pub fn pooling(&self) -> Pooling {
        self.pooling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn small_config() -> TimeSeriesTransformerConfig {
        TimeSeriesTransformerConfig::new(12).with_d_model(16).with_d_ff(32)
    }

    #[test]
    fn test_default_config() {
        let config = TimeSeriesTransformerConfig::default();
        assert_eq!(config.input_dim, 4);
        assert_eq!(config.d_model, 48);
        assert_eq!(config.nhead, 4);
        assert_eq!(config.num_layers, 1);
        assert_eq!(config.output_window, 72);
        assert_eq!(config.max_len, 5000);
        assert_eq!(config.pooling, Pooling::Last);
        config.validate().unwrap();
    }

    #[test]
    fn test_forward_shape_default() {
        let device = Default::default();
        let model = TimeSeriesTransformerConfig::default()
            .init::<TestBackend>(&device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::random([2, 96, 4], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(model.forward(x).unwrap().dims(), [2, 72]);
    }

    #[test]
    fn test_mean_pooling_shape() {
        let device = Default::default();
        let model = small_config()
            .with_pooling(Pooling::Mean)
            .with_num_layers(2)
            .init::<TestBackend>(&device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::random([3, 20, 4], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(model.forward(x).unwrap().dims(), [3, 12]);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device).unwrap();
        let x = Tensor::<TestBackend, 3>::random([1, 24, 4], Distribution::Normal(0.0, 1.0), &device);
        let a = model.forward(x.clone()).unwrap().into_data().to_vec::<f32>().unwrap();
        let b = model.forward(x).unwrap().into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_long_sequence() {
        let device = Default::default();
        let model = small_config().with_max_len(32).init::<TestBackend>(&device).unwrap();
        let x = Tensor::<TestBackend, 3>::zeros([1, 33, 4], &device);
        assert!(matches!(
            model.forward(x),
            Err(ModelError::SequenceTooLong { length: 33, max_len: 32 })
        ));
    }

    #[test]
    fn test_rejects_wrong_channels() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device).unwrap();
        let x = Tensor::<TestBackend, 3>::zeros([1, 8, 3], &device);
        let err = model.forward(x).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_configs() {
        assert!(small_config().with_nhead(5).validate().is_err());
        assert!(small_config().with_dropout(1.0).validate().is_err());
        assert!(small_config().with_output_window(0).validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = small_config().with_pooling(Pooling::Mean);
        let json = serde_json::to_string(&config).unwrap();
        let back: TimeSeriesTransformerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_pooling_strategies_share_weights() {
        let device = Default::default();
        let last = small_config().init::<TestBackend>(&device).unwrap();
        assert_eq!(last.pooling(), Pooling::Last);
        let mut mean = last.clone();
        mean.pooling = Pooling::Mean;

        // With one time step both strategies see the same vector.
        let single = Tensor::<TestBackend, 3>::random([2, 1, 4], Distribution::Normal(0.0, 1.0), &device);
        let a = last.forward(single.clone()).unwrap().into_data().to_vec::<f32>().unwrap();
        let b = mean.forward(single).unwrap().into_data().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }

        let long = Tensor::<TestBackend, 3>::random([2, 16, 4], Distribution::Normal(0.0, 1.0), &device);
        let a = last.forward(long.clone()).unwrap().into_data().to_vec::<f32>().unwrap();
        let b = mean.forward(long).unwrap().into_data().to_vec::<f32>().unwrap();
        assert!(a.iter().zip(&b).any(|(x, y)| (x - y).abs() > 1e-6));
    }
}
