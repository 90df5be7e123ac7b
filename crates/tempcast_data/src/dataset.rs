//! Windowed, normalized training examples.

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};
use tempcast_core::{CoreError, NormalizationStats, Split, WindowConfig, N_CHANNELS, TARGET_CHANNEL};

use crate::error::{DataError, Result};
use crate::series::WeatherSeries;

/// Sliding-window examples cut from one split of a [`WeatherSeries`].
///
/// Example `i` pairs
/// - `X`: rows `[i, i + input_window)` of all channels, shape `(input_window, 4)`
/// - `y`: rows `[i + input_window, i + input_window + output_window)` of temperature
///
/// with stride 1. A split of `n` rows yields `n - input_window - output_window`
/// examples. Every value is normalized with the statistics the dataset was
/// built with, which are always the training-split statistics.
///
/// # Example
///
/// ```rust,ignore
/// use tempcast_core::WindowConfig;
/// use tempcast_data::{WeatherSeries, WindowedSeriesDataset};
///
/// let series = WeatherSeries::from_csv("weather.csv")?;
/// let train = WindowedSeriesDataset::train(&series, WindowConfig::default())?;
/// let (x, y) = train.get(0)?; // (96, 4), (72,)
/// ```
#[derive(Debug, Clone)]
pub struct WindowedSeriesDataset {
    /// Inputs (N, input_window, channels)
    x: Array3<f32>,
    /// Targets (N, output_window)
    y: Array2<f32>,
    stats: NormalizationStats,
    config: WindowConfig,
    split: Split,
}

impl WindowedSeriesDataset {
    /// Build the training split and compute its normalization statistics.
    ///
    /// Statistics come from rows `[0, split_index)` only.
    pub fn train(series: &WeatherSeries, config: WindowConfig) -> Result<Self> {
        config.validate()?;
        let rows = Split::Train.row_range(series.len(), &config)?;
        let stats = NormalizationStats::from_rows(&series.rows()[rows]).map_err(|e| match e {
            CoreError::InsufficientRows { available, .. } => DataError::InsufficientRows {
                split: Split::Train,
                required: config.span(),
                available,
            },
            other => other.into(),
        })?;
        Self::with_stats(series, Split::Train, config, stats)
    }

    /// Build the test split, normalized with the given training statistics.
    pub fn test(
        series: &WeatherSeries,
        config: WindowConfig,
        train_stats: NormalizationStats,
    ) -> Result<Self> {
        Self::with_stats(series, Split::Test, config, train_stats)
    }

    /// Build both splits, threading the training statistics into the test split.
    pub fn train_test(series: &WeatherSeries, config: WindowConfig) -> Result<(Self, Self)> {
        let train = Self::train(series, config)?;
        let test = Self::test(series, config, train.stats)?;
        Ok((train, test))
    }

    /// Build any split with explicit statistics.
    ///
    /// # Errors
    ///
    /// Fails fast when the split holds no complete window, rather than
    /// returning an empty dataset.
    pub fn with_stats(
        series: &WeatherSeries,
        split: Split,
        config: WindowConfig,
        stats: NormalizationStats,
    ) -> Result<Self> {
        config.validate()?;
        stats.validate()?;

        let span = config.span();
        let rows = split
            .row_range(series.len(), &config)
            .map_err(|e| match e {
                CoreError::InsufficientRows { available, .. } => DataError::InsufficientRows {
                    split,
                    required: span,
                    available,
                },
                other => other.into(),
            })?;
        let rows = &series.rows()[rows];

        let n_samples = rows.len().saturating_sub(span);
        if n_samples == 0 {
            return Err(DataError::InsufficientRows {
                split,
                required: span,
                available: rows.len(),
            });
        }

        let normalized: Vec<[f32; N_CHANNELS]> =
            rows.iter().map(|row| stats.normalize_row(row)).collect();

        let (iw, ow) = (config.input_window, config.output_window);
        let mut x = Array3::<f32>::zeros((n_samples, iw, N_CHANNELS));
        let mut y = Array2::<f32>::zeros((n_samples, ow));

        for i in 0..n_samples {
            for t in 0..iw {
                for c in 0..N_CHANNELS {
                    x[[i, t, c]] = normalized[i + t][c];
                }
            }
            for h in 0..ow {
                y[[i, h]] = normalized[i + iw + h][TARGET_CHANNEL];
            }
        }

        tracing::debug!(
            "Built {} split: {} windows from {} rows (input={}, output={})",
            split,
            n_samples,
            rows.len(),
            iw,
            ow
        );

        Ok(Self {
            x,
            y,
            stats,
            config,
            split,
        })
    }

    /// Number of examples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.shape()[0]
    }

    /// Check if the dataset has no examples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get example `index` as `(X, y)`.
    pub fn get(&self, index: usize) -> Result<(ArrayView2<'_, f32>, ArrayView1<'_, f32>)> {
        if index >= self.len() {
            return Err(DataError::IndexOutOfBounds {
                index,
                length: self.len(),
            });
        }
        Ok((
            self.x.index_axis(Axis(0), index),
            self.y.index_axis(Axis(0), index),
        ))
    }

    /// The normalization statistics every value was scaled with.
    #[must_use]
    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    /// Window settings.
    #[must_use]
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Which split this dataset holds.
    #[must_use]
    pub fn split(&self) -> Split {
        self.split
    }

    /// All inputs, `(N, input_window, channels)`.
    #[must_use]
    pub fn x(&self) -> &Array3<f32> {
        &self.x
    }

    /// All targets, `(N, output_window)`.
    #[must_use]
    pub fn y(&self) -> &Array2<f32> {
        &self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rows where every channel encodes its own row index.
    fn ramp(n: usize) -> WeatherSeries {
        WeatherSeries::from_rows(
            (0..n)
                .map(|i| {
                    let t = i as f32;
                    [t, 2.0 * t, 3.0 * t, 1000.0 + t]
                })
                .collect(),
        )
    }

    #[test]
    fn test_train_length_formula() {
        let config = WindowConfig::default();
        for total in [250usize, 500, 1000, 1234] {
            let ds = WindowedSeriesDataset::train(&ramp(total), config).unwrap();
            assert_eq!(ds.len(), config.split_index(total) - config.span(), "T = {total}");
        }
    }

    #[test]
    fn test_too_short_fails_fast() {
        let config = WindowConfig::default();
        let err = WindowedSeriesDataset::train(&ramp(200), config).unwrap_err();
        assert!(matches!(
            err,
            DataError::InsufficientRows { split: Split::Train, required: 168, available: 160 }
        ));
    }

    #[test]
    fn test_window_contents() {
        let config = WindowConfig::new(4, 2);
        let series = ramp(20);
        let ds = WindowedSeriesDataset::train(&series, config).unwrap();
        assert_eq!(ds.len(), 16 - 6);

        let stats = *ds.stats();
        let (x, y) = ds.get(3).unwrap();
        assert_eq!(x.shape(), &[4, 4]);
        assert_eq!(y.len(), 2);
        for t in 0..4 {
            let raw = series.rows()[3 + t];
            for c in 0..N_CHANNELS {
                assert_eq!(x[[t, c]], stats.normalize(c, raw[c]));
            }
        }
        assert_eq!(y[0], stats.normalize(0, 7.0));
        assert_eq!(y[1], stats.normalize(0, 8.0));
    }

    #[test]
    fn test_stats_come_from_train_rows_only() {
        let config = WindowConfig::new(4, 2);
        let series = ramp(20);
        let (train, test) = WindowedSeriesDataset::train_test(&series, config).unwrap();
        // Train rows are 0..16, so the temperature mean is 7.5.
        assert_eq!(train.stats().mean[0], 7.5);
        assert_eq!(train.stats(), test.stats());
    }

    #[test]
    fn test_test_split_starts_one_span_before_boundary() {
        let config = WindowConfig::new(4, 2);
        let series = ramp(20);
        let (train, test) = WindowedSeriesDataset::train_test(&series, config).unwrap();
        let stats = *train.stats();
        // Test rows are 10..20 -> 4 windows, the first input starting at row 10.
        assert_eq!(test.len(), 4);
        let (x, y) = test.get(0).unwrap();
        assert_eq!(x[[0, 0]], stats.normalize(0, 10.0));
        assert_eq!(y[0], stats.normalize(0, 14.0));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let ds = WindowedSeriesDataset::train(&ramp(20), WindowConfig::new(4, 2)).unwrap();
        assert!(matches!(
            ds.get(ds.len()),
            Err(DataError::IndexOutOfBounds { .. })
        ));
    }
}
