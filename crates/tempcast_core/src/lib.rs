//! # tempcast_core
//!
//! Core types shared by every tempcast crate.
//!
//! This crate provides:
//! - [`Channel`] and [`CHANNELS`], the fixed channel order the model is trained on
//! - [`NormalizationStats`] for z-score bookkeeping between training and serving
//! - [`WindowConfig`] for the input/output window lengths and the train/test ratio
//! - [`Split`] for temporal train/test row ranges
//! - [`Seed`] for deterministic shuffling
//!
//! ## Layout Convention
//!
//! Model inputs follow `(B, L, C)`:
//! - `B`: Batch size
//! - `L`: Input window length (time steps)
//! - `C`: Channels, always in [`CHANNELS`] order
//!
//! Targets are `(B, H)` where `H` is the output window of temperature values.
//!
//! ## Example
//!
//! ```rust
//! use tempcast_core::{NormalizationStats, WindowConfig};
//!
//! let window = WindowConfig::default();
//! assert_eq!(window.input_window, 96);
//!
//! let rows = vec![[10.0, 80.0, 5.0, 1010.0], [14.0, 60.0, 7.0, 1014.0]];
//! let stats = NormalizationStats::from_rows(&rows).unwrap();
//! let z = stats.normalize(0, 14.0);
//! assert!((stats.denormalize(0, z) - 14.0).abs() < 1e-5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod channel;
mod error;
mod seed;
mod split;
mod stats;
mod window;

pub use channel::{Channel, CHANNELS, N_CHANNELS, TARGET_CHANNEL};
pub use error::{CoreError, Result};
pub use seed::Seed;
pub use split::Split;
pub use stats::{NormalizationStats, MIN_STD};
pub use window::{
    WindowConfig, DEFAULT_INPUT_WINDOW, DEFAULT_OUTPUT_WINDOW, DEFAULT_SPLIT_RATIO,
    WEEKLY_INPUT_WINDOW,
};
