//! Error types for tempcast_models.

use std::path::PathBuf;

use tempcast_core::CoreError;
use thiserror::Error;

/// Result type alias using [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while building, running or persisting the model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A hyperparameter is out of range.
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    /// Input sequence is longer than the positional table.
    #[error("Sequence length {length} exceeds positional encoding max_len {max_len}")]
    SequenceTooLong {
        /// Length of the input sequence.
        length: usize,
        /// Rows in the positional table.
        max_len: usize,
    },

    /// Input tensor does not have the expected shape.
    #[error("Shape mismatch: expected {expected}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual dimensions.
        got: Vec<usize>,
    },

    /// Stored checkpoint was produced by a different architecture.
    #[error("Architecture mismatch: checkpoint has {found}, expected {expected}")]
    ArchitectureMismatch {
        /// Expected architecture description.
        expected: String,
        /// Architecture found in the checkpoint.
        found: String,
    },

    /// Checkpoint file does not exist.
    #[error("Checkpoint not found: {}", .0.display())]
    CheckpointNotFound(PathBuf),

    /// Failed to write a checkpoint.
    #[error("Failed to save checkpoint: {0}")]
    Save(String),

    /// Failed to read a checkpoint.
    #[error("Failed to load checkpoint: {0}")]
    Load(String),

    /// Invalid statistics or window settings in checkpoint metadata.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Metadata (de)serialization error.
    #[error("Metadata error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    /// True when the error means the model files are absent rather than broken.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CheckpointNotFound(_))
    }

    /// True for errors caused by incompatible settings or input shapes.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_)
                | Self::SequenceTooLong { .. }
                | Self::ShapeMismatch { .. }
                | Self::ArchitectureMismatch { .. }
        )
    }
}
