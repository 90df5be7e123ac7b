//! Error types for tempcast_data.

use tempcast_core::Split;
use thiserror::Error;

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading or windowing data.
#[derive(Error, Debug)]
pub enum DataError {
    /// A required channel column is absent from the CSV header.
    #[error("Missing column '{column}' (found: {found})")]
    MissingColumn {
        /// Canonical name of the missing channel.
        column: String,
        /// Headers present in the file.
        found: String,
    },

    /// A cell could not be parsed as a finite number.
    #[error("Parse error at line {line}, column '{column}': {value:?}")]
    Parse {
        /// 1-based line number in the file (header is line 1).
        line: usize,
        /// Column name.
        column: String,
        /// Raw cell content.
        value: String,
    },

    /// The split is too short for even one window.
    #[error("Not enough rows for the {split} split: need more than {required}, got {available}")]
    InsufficientRows {
        /// Which split was requested.
        split: Split,
        /// Minimum rows the split needs (exclusive).
        required: usize,
        /// Rows available to the split.
        available: usize,
    },

    /// Index out of bounds.
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The length of the collection.
        length: usize,
    },

    /// Batch size error.
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// Empty dataset.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// CSV reader error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] tempcast_core::CoreError),
}
