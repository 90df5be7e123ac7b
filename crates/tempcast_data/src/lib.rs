//! # tempcast_data
//!
//! Data handling for tempcast.
//!
//! This crate provides:
//! - [`WeatherSeries`] for loading the four weather channels from CSV
//! - [`WindowedSeriesDataset`] for normalized `(input window, forecast window)` examples
//! - [`WindowLoader`] for batched iteration as Burn tensors
//!
//! ## Example
//!
//! ```rust,ignore
//! use tempcast_core::WindowConfig;
//! use tempcast_data::{WeatherSeries, WindowedSeriesDataset, WindowLoader};
//!
//! let series = WeatherSeries::from_csv("weather.csv")?;
//! let (train, test) = WindowedSeriesDataset::train_test(&series, WindowConfig::default())?;
//!
//! // Test windows are normalized with the training statistics.
//! assert_eq!(train.stats(), test.stats());
//!
//! let loader = WindowLoader::builder(&train).batch_size(256).shuffle(true).build()?;
//! for batch in loader.iter::<NdArray>(&device) {
//!     let batch = batch?; // x: [B, 96, 4], y: [B, 72]
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod dataset;
mod error;
mod loader;
mod series;

pub use dataset::WindowedSeriesDataset;
pub use error::{DataError, Result};
pub use loader::{WindowBatch, WindowLoader, WindowLoaderBuilder, WindowLoaderIter};
pub use series::WeatherSeries;
