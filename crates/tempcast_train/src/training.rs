//! Training loop.

use std::path::PathBuf;
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use tempcast_core::Seed;
use tempcast_data::{WindowLoader, WindowedSeriesDataset};
use tempcast_models::{
    save_checkpoint, CheckpointMetadata, CheckpointPaths, ModelError, TimeSeriesTransformer,
    TimeSeriesTransformerConfig, DEFAULT_CHECKPOINT_NAME,
};

use crate::clip::clip_global_norm;
use crate::error::{Result, TrainError};

/// Adam epsilon.
const ADAM_EPSILON: f32 = 1e-8;

/// Configuration for [`ForecastTrainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Number of passes over the training split.
    pub epochs: usize,
    /// Constant Adam learning rate.
    pub learning_rate: f64,
    /// Examples per batch.
    pub batch_size: usize,
    /// Maximum global gradient norm (0 = disabled).
    pub grad_clip_norm: f32,
    /// Log the batch loss every this many batches (0 = never).
    pub log_every: usize,
    /// Seed for weight initialization, dropout and shuffling.
    pub seed: u64,
    /// Shuffle examples within the training split each epoch.
    pub shuffle: bool,
    /// Where to write the final checkpoint. Nothing is written when unset.
    pub checkpoint_dir: Option<PathBuf>,
    /// Checkpoint file stem.
    pub checkpoint_name: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 1,
            learning_rate: 1e-3,
            batch_size: 256,
            grad_clip_norm: 1.0,
            log_every: 10,
            seed: 42,
            shuffle: true,
            checkpoint_dir: None,
            checkpoint_name: DEFAULT_CHECKPOINT_NAME.to_string(),
        }
    }
}

impl TrainerConfig {
    /// Set the number of epochs.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the gradient clipping norm.
    #[must_use]
    pub fn with_grad_clip_norm(mut self, grad_clip_norm: f32) -> Self {
        self.grad_clip_norm = grad_clip_norm;
        self
    }

    /// Set the logging cadence.
    #[must_use]
    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Write the final checkpoint to `dir`.
    #[must_use]
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Set the checkpoint file stem.
    #[must_use]
    pub fn with_checkpoint_name(mut self, name: impl Into<String>) -> Self {
        self.checkpoint_name = name.into();
        self
    }

    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(TrainError::InvalidConfig("epochs must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TrainError::InvalidConfig("batch_size must be > 0".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !self.grad_clip_norm.is_finite() || self.grad_clip_norm < 0.0 {
            return Err(TrainError::InvalidConfig(format!(
                "grad_clip_norm must be >= 0, got {}",
                self.grad_clip_norm
            )));
        }
        if self.checkpoint_name.is_empty() {
            return Err(TrainError::InvalidConfig(
                "checkpoint_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a training run.
#[derive(Debug)]
pub struct TrainingOutput<B: AutodiffBackend> {
    /// Trained model, still on the autodiff backend. Call `.valid()` to serve it.
    pub model: TimeSeriesTransformer<B>,
    /// Everything needed to reload and serve the model.
    pub metadata: CheckpointMetadata,
    /// Mean loss per epoch.
    pub epoch_losses: Vec<f32>,
    /// Loss of every batch, in order.
    pub batch_losses: Vec<f32>,
    /// Checkpoint location, when one was written.
    pub checkpoint: Option<CheckpointPaths>,
    /// Total training time in seconds.
    pub training_time_secs: f64,
}

impl<B: AutodiffBackend> TrainingOutput<B> {
    /// Mean loss of the last epoch.
    #[must_use]
    pub fn final_loss(&self) -> Option<f32> {
        self.epoch_losses.last().copied()
    }
}

/// Fixed-epoch trainer for [`TimeSeriesTransformer`].
///
/// Each batch runs forward, MSE loss against the normalized targets,
/// backward, global-norm clipping and one Adam step. There is no
/// validation loop and no early stopping. A NaN or infinite loss aborts
/// the run before the optimizer touches the weights.
pub struct ForecastTrainer<B: AutodiffBackend> {
    config: TrainerConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> ForecastTrainer<B> {
    /// Create a new trainer.
    pub fn new(config: TrainerConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Trainer settings.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Seed the backend and build a fresh model.
    pub fn init_model(
        &self,
        model_config: &TimeSeriesTransformerConfig,
    ) -> Result<TimeSeriesTransformer<B>> {
        B::seed(self.config.seed);
        Ok(model_config.init::<B>(&self.device)?)
    }

    /// Build a model from `model_config`, train it on `train` and write the
    /// checkpoint if a directory is configured.
    pub fn fit(
        &self,
        model_config: &TimeSeriesTransformerConfig,
        train: &WindowedSeriesDataset,
    ) -> Result<TrainingOutput<B>> {
        let model = self.init_model(model_config)?;
        self.fit_model(model, model_config, train)
    }

    /// Train an already built model.
    ///
    /// `model_config` must be the configuration `model` was built from; it
    /// is stored in the checkpoint metadata.
    pub fn fit_model(
        &self,
        model: TimeSeriesTransformer<B>,
        model_config: &TimeSeriesTransformerConfig,
        train: &WindowedSeriesDataset,
    ) -> Result<TrainingOutput<B>> {
        self.config.validate()?;
        let window = *train.config();
        check_compatible(model_config, &window)?;

        let start_time = Instant::now();
        let shuffle_seed = Seed::new(self.config.seed).derive("shuffle");
        let loader = WindowLoader::builder(train)
            .batch_size(self.config.batch_size)
            .shuffle(self.config.shuffle)
            .seed(shuffle_seed)
            .build()?;

        tracing::info!(
            "Training on {} windows ({} batches/epoch) for {} epoch(s), {} parameters",
            train.len(),
            loader.n_batches(),
            self.config.epochs,
            model.num_params()
        );

        let mut optim = AdamConfig::new()
            .with_epsilon(ADAM_EPSILON)
            .init::<B, TimeSeriesTransformer<B>>();

        let mut model = model;
        let mut epoch_losses = Vec::with_capacity(self.config.epochs);
        let mut batch_losses = Vec::new();

        for epoch in 1..=self.config.epochs {
            let epoch_start = Instant::now();
            let epoch_seed = shuffle_seed.derive(&format!("epoch-{epoch}"));
            let n_batches = loader.n_batches();
            let mut total_loss = 0.0f64;

            for (i, batch) in loader.iter_with_seed::<B>(&self.device, epoch_seed).enumerate() {
                let batch = batch?;
                let batch_idx = i + 1;

                let preds = model.forward(batch.x)?;
                let loss = MseLoss::new().forward(preds, batch.y, Reduction::Mean);
                let loss_value: f32 = loss.clone().into_scalar().elem();

                if !loss_value.is_finite() {
                    tracing::error!(
                        "Non-finite loss {} at epoch {}, batch {}; aborting",
                        loss_value,
                        epoch,
                        batch_idx
                    );
                    return Err(TrainError::NonFiniteLoss {
                        epoch,
                        batch: batch_idx,
                        value: loss_value,
                    });
                }

                let mut grads = GradientsParams::from_grads(loss.backward(), &model);
                if self.config.grad_clip_norm > 0.0 {
                    let norm =
                        clip_global_norm::<B, _>(&model, &mut grads, self.config.grad_clip_norm);
                    if !norm.is_finite() {
                        tracing::error!(
                            "Non-finite gradient norm {} at epoch {}, batch {}; aborting",
                            norm,
                            epoch,
                            batch_idx
                        );
                        return Err(TrainError::NonFiniteGradient {
                            epoch,
                            batch: batch_idx,
                            norm,
                        });
                    }
                }
                model = optim.step(self.config.learning_rate, model, grads);

                total_loss += f64::from(loss_value);
                batch_losses.push(loss_value);

                if self.config.log_every > 0 && batch_idx % self.config.log_every == 0 {
                    tracing::info!(
                        "Epoch {}/{}, Batch {}/{}, Loss: {:.4}",
                        epoch,
                        self.config.epochs,
                        batch_idx,
                        n_batches,
                        loss_value
                    );
                }
            }

            let avg_loss = (total_loss / n_batches as f64) as f32;
            epoch_losses.push(avg_loss);
            tracing::info!(
                "Epoch {}/{} completed. Average Loss: {:.4}, Time: {:.2}s",
                epoch,
                self.config.epochs,
                avg_loss,
                epoch_start.elapsed().as_secs_f64()
            );
        }

        let mut metadata = CheckpointMetadata::new(model_config.clone(), window, *train.stats())
            .with_epochs(self.config.epochs);
        if let Some(&loss) = epoch_losses.last() {
            metadata = metadata.with_final_loss(loss);
        }

        let checkpoint = match &self.config.checkpoint_dir {
            Some(dir) => Some(save_checkpoint(
                &model.valid(),
                &metadata,
                dir,
                &self.config.checkpoint_name,
            )?),
            None => None,
        };

        let training_time_secs = start_time.elapsed().as_secs_f64();
        tracing::info!("Training complete in {:.1}s", training_time_secs);

        Ok(TrainingOutput {
            model,
            metadata,
            epoch_losses,
            batch_losses,
            checkpoint,
            training_time_secs,
        })
    }
}

fn check_compatible(
    model_config: &TimeSeriesTransformerConfig,
    window: &tempcast_core::WindowConfig,
) -> std::result::Result<(), ModelError> {
    if model_config.output_window != window.output_window {
        return Err(ModelError::InvalidConfig(format!(
            "model output_window ({}) differs from dataset output_window ({})",
            model_config.output_window, window.output_window
        )));
    }
    if window.input_window > model_config.max_len {
        return Err(ModelError::SequenceTooLong {
            length: window.input_window,
            max_len: model_config.max_len,
        });
    }
    Ok(())
}
