//! Error types for tempcast_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors raised while validating settings or statistics.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Not enough rows for the requested operation.
    #[error("Insufficient rows: need at least {required}, got {available}")]
    InsufficientRows {
        /// Rows required.
        required: usize,
        /// Rows available.
        available: usize,
    },

    /// Statistics contain NaN or infinite values.
    #[error("Invalid statistics: {0}")]
    InvalidStatistics(String),
}
