//! Error types for configuration files and serving.

use std::path::PathBuf;

use tempcast_core::CoreError;
use tempcast_data::DataError;
use tempcast_models::ModelError;
use tempcast_train::TrainError;
use thiserror::Error;

/// Errors reading, writing or validating an [`ExperimentConfig`](crate::ExperimentConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings are inconsistent or out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Config file could not be read or written.
    #[error("Config file {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the expected schema.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CoreError> for ConfigError {
    fn from(e: CoreError) -> Self {
        Self::Invalid(e.to_string())
    }
}

impl From<ModelError> for ConfigError {
    fn from(e: ModelError) -> Self {
        Self::Invalid(e.to_string())
    }
}

impl From<TrainError> for ConfigError {
    fn from(e: TrainError) -> Self {
        Self::Invalid(e.to_string())
    }
}

/// Discriminant of [`PredictError`] so callers can pick a fallback per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictErrorKind {
    /// Checkpoint missing or unreadable.
    ModelUnavailable,
    /// Fewer rows than the input window.
    InsufficientData,
    /// Incompatible settings or shapes.
    Configuration,
    /// Input data could not be read.
    Data,
    /// Numeric failure during inference.
    Prediction,
}

/// Errors returned by [`Predictor`](crate::Predictor).
#[derive(Error, Debug)]
pub enum PredictError {
    /// Checkpoint is missing or cannot be decoded.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[source] ModelError),

    /// Series has fewer rows than the model's input window.
    #[error("Insufficient data: need at least {required} rows, got {available}")]
    InsufficientData {
        /// Rows required.
        required: usize,
        /// Rows available.
        available: usize,
    },

    /// Settings or input shapes do not fit the loaded model.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input data could not be read.
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Inference failed or produced non-finite values.
    #[error("Prediction failed: {0}")]
    Prediction(String),
}

impl PredictError {
    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> PredictErrorKind {
        match self {
            Self::ModelUnavailable(_) => PredictErrorKind::ModelUnavailable,
            Self::InsufficientData { .. } => PredictErrorKind::InsufficientData,
            Self::Configuration(_) => PredictErrorKind::Configuration,
            Self::Data(_) => PredictErrorKind::Data,
            Self::Prediction(_) => PredictErrorKind::Prediction,
        }
    }

    /// Classify an error raised while loading a checkpoint.
    pub(crate) fn from_load(e: ModelError) -> Self {
        if e.is_configuration() || matches!(e, ModelError::Core(_)) {
            Self::Configuration(e.to_string())
        } else {
            Self::ModelUnavailable(e)
        }
    }

    /// Classify an error raised by a forward pass.
    pub(crate) fn from_forward(e: ModelError) -> Self {
        if e.is_configuration() {
            Self::Configuration(e.to_string())
        } else {
            Self::Prediction(e.to_string())
        }
    }
}
