//! # tempcast_models
//!
//! The forecasting network and its persistence.
//!
//! - [`PositionalEncoding`] - fixed sinusoidal position table
//! - [`EncoderBlock`] - post-norm self-attention + GELU feed-forward block
//! - [`TimeSeriesTransformer`] - `(B, L, 4)` inputs to a `(B, H)` temperature horizon
//! - [`checkpoint`] - weights blob plus JSON metadata on disk
//!
//! ## Example
//!
//! ```rust,ignore
//! use burn_ndarray::NdArray;
//! use tempcast_models::TimeSeriesTransformerConfig;
//!
//! let device = Default::default();
//! let model = TimeSeriesTransformerConfig::default().init::<NdArray>(&device)?;
//! let y = model.forward(x)?; // (B, 96, 4) -> (B, 72)
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
mod error;
pub mod transformer;

pub use checkpoint::{
    load_checkpoint, save_checkpoint, CheckpointMetadata, CheckpointPaths, ARCHITECTURE,
    DEFAULT_CHECKPOINT_DIR, DEFAULT_CHECKPOINT_NAME,
};
pub use error::{ModelError, Result};
pub use transformer::{
    sinusoidal_table, EncoderBlock, Pooling, PositionalEncoding, TimeSeriesTransformer,
    TimeSeriesTransformerConfig, DEFAULT_MAX_LEN,
};
