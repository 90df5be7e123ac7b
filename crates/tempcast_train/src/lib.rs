//! # tempcast_train
//!
//! Training and evaluation for the temperature forecaster.
//!
//! This crate provides:
//! - [`ForecastTrainer`], a fixed-epoch loop with MSE loss, global-norm
//!   gradient clipping and Adam
//! - [`clip`] helpers that measure and rescale gradients across all parameters
//! - [`evaluate`] for MAE/RMSE on the test split in original units
//!
//! ## Example
//!
//! ```rust,ignore
//! use burn::backend::Autodiff;
//! use burn_ndarray::NdArray;
//! use tempcast_train::{ForecastTrainer, TrainerConfig};
//!
//! let trainer = ForecastTrainer::<Autodiff<NdArray>>::new(TrainerConfig::default(), device);
//! let output = trainer.fit(&model_config, &train)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clip;
mod error;
pub mod evaluation;
pub mod training;

pub use clip::{clip_global_norm, global_grad_norm};
pub use error::{Result, TrainError};
pub use evaluation::{evaluate, mean_absolute_error, root_mean_squared_error, EvaluationReport};
pub use training::{ForecastTrainer, TrainerConfig, TrainingOutput};
