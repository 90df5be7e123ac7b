//! # tempcast
//!
//! Forecast the next 72 hours of temperature from the last 96 hours of
//! temperature, humidity, wind speed and pressure.
//!
//! - **Data**: CSV ingestion, training-split normalization, sliding windows
//! - **Model**: transformer encoder with last-step pooling and a linear
//!   multi-horizon head
//! - **Training**: fixed-epoch Adam loop with global-norm clipping
//! - **Serving**: [`Predictor`] and the lazily loading [`LazyPredictor`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tempcast::prelude::*;
//!
//! let config = ExperimentConfig::default()
//!     .with_trainer(TrainerConfig::default().with_checkpoint_dir("checkpoints"));
//! let series = WeatherSeries::from_csv("weather.csv")?;
//! let (train, _test) = WindowedSeriesDataset::train_test(&series, config.window)?;
//!
//! let trainer = ForecastTrainer::<TrainingBackend>::new(config.trainer.clone(), Default::default());
//! trainer.fit(&config.model, &train)?;
//!
//! let predictor = Predictor::<InferenceBackend>::load("checkpoints", DEFAULT_CHECKPOINT_NAME, &Default::default())?;
//! let forecast = predictor.predict(&series)?;
//! assert_eq!(forecast.len(), 72);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod error;
pub mod predictor;

pub use tempcast_core as core;
pub use tempcast_data as data;
pub use tempcast_models as models;
pub use tempcast_train as train;

pub use config::ExperimentConfig;
pub use error::{ConfigError, PredictError, PredictErrorKind};
pub use predictor::{Forecast, LazyPredictor, Predictor};

/// CPU backend used for inference.
pub type InferenceBackend = burn_ndarray::NdArray;

/// CPU backend with automatic differentiation, used for training.
pub type TrainingBackend = burn_autodiff::Autodiff<burn_ndarray::NdArray>;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tempcast::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        ExperimentConfig, Forecast, InferenceBackend, LazyPredictor, PredictError,
        PredictErrorKind, Predictor, TrainingBackend,
    };

    pub use tempcast_core::{Channel, NormalizationStats, Seed, Split, WindowConfig, CHANNELS};
    pub use tempcast_data::{WeatherSeries, WindowLoader, WindowedSeriesDataset};
    pub use tempcast_models::{
        load_checkpoint, save_checkpoint, CheckpointMetadata, Pooling, TimeSeriesTransformer,
        TimeSeriesTransformerConfig, DEFAULT_CHECKPOINT_DIR, DEFAULT_CHECKPOINT_NAME,
    };
    pub use tempcast_train::{evaluate, EvaluationReport, ForecastTrainer, TrainerConfig};
}
