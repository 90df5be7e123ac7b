//! Error types for training.

use tempcast_data::DataError;
use tempcast_models::ModelError;
use thiserror::Error;

/// Result type alias for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Errors that can occur during training or evaluation.
#[derive(Error, Debug)]
pub enum TrainError {
    /// Trainer settings are out of range.
    #[error("Invalid trainer configuration: {0}")]
    InvalidConfig(String),

    /// Loss became NaN or infinite. Training stops before the optimizer step.
    #[error("Non-finite loss {value} at epoch {epoch}, batch {batch}")]
    NonFiniteLoss {
        /// Epoch, 1-based.
        epoch: usize,
        /// Batch within the epoch, 1-based.
        batch: usize,
        /// Offending loss value.
        value: f32,
    },

    /// Gradient norm became NaN or infinite. Training stops before the optimizer step.
    #[error("Non-finite gradient norm {norm} at epoch {epoch}, batch {batch}")]
    NonFiniteGradient {
        /// Epoch, 1-based.
        epoch: usize,
        /// Batch within the epoch, 1-based.
        batch: usize,
        /// Measured global norm.
        norm: f64,
    },

    /// Tensor contents could not be read back.
    #[error("Tensor data error: {0}")]
    Tensor(String),

    /// Data error.
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Model or checkpoint error.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}
