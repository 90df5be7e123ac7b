//! Per-channel z-score statistics.

use serde::{Deserialize, Serialize};

use crate::channel::{N_CHANNELS, TARGET_CHANNEL};
use crate::error::{CoreError, Result};

/// Standard deviations below this are treated as a constant channel and
/// replaced by `1.0`, so normalization never divides by zero.
pub const MIN_STD: f32 = 1e-6;

/// Mean and standard deviation of each channel over the training rows.
///
/// The same instance normalizes training windows, test windows and live
/// inputs, and denormalizes forecasts. It is computed once from the train
/// split and persisted next to the checkpoint.
///
/// Standard deviation uses the sample (n - 1) estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    /// Per-channel mean, in [`crate::CHANNELS`] order.
    pub mean: [f32; N_CHANNELS],
    /// Per-channel standard deviation, in [`crate::CHANNELS`] order.
    pub std: [f32; N_CHANNELS],
}

impl NormalizationStats {
    /// Build statistics from explicit values.
    pub fn new(mean: [f32; N_CHANNELS], std: [f32; N_CHANNELS]) -> Result<Self> {
        let stats = Self { mean, std };
        stats.validate()?;
        Ok(stats)
    }

    /// Compute statistics over a block of rows.
    ///
    /// Accumulates in `f64` and stores `f32`.
    ///
    /// # Errors
    ///
    /// Needs at least two rows, and every value must be finite.
    pub fn from_rows(rows: &[[f32; N_CHANNELS]]) -> Result<Self> {
        if rows.len() < 2 {
            return Err(CoreError::InsufficientRows {
                required: 2,
                available: rows.len(),
            });
        }

        let n = rows.len() as f64;
        let mut sum = [0.0f64; N_CHANNELS];
        for row in rows {
            for (c, &v) in row.iter().enumerate() {
                sum[c] += f64::from(v);
            }
        }
        let mean64 = sum.map(|s| s / n);

        let mut sq = [0.0f64; N_CHANNELS];
        for row in rows {
            for (c, &v) in row.iter().enumerate() {
                let d = f64::from(v) - mean64[c];
                sq[c] += d * d;
            }
        }

        let mean = mean64.map(|m| m as f32);
        let std = sq.map(|s| {
            let std = (s / (n - 1.0)).sqrt() as f32;
            if std < MIN_STD {
                1.0
            } else {
                std
            }
        });

        Self::new(mean, std)
    }

    /// Identity statistics (mean 0, std 1).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            mean: [0.0; N_CHANNELS],
            std: [1.0; N_CHANNELS],
        }
    }

    /// Check that every value is finite and every std is positive.
    pub fn validate(&self) -> Result<()> {
        for c in 0..N_CHANNELS {
            if !self.mean[c].is_finite() {
                return Err(CoreError::InvalidStatistics(format!(
                    "mean of channel {c} is {}",
                    self.mean[c]
                )));
            }
            if !(self.std[c].is_finite() && self.std[c] > 0.0) {
                return Err(CoreError::InvalidStatistics(format!(
                    "std of channel {c} is {}",
                    self.std[c]
                )));
            }
        }
        Ok(())
    }

    /// `(value - mean) / std` for one channel.
    #[inline]
    #[must_use]
    pub fn normalize(&self, channel: usize, value: f32) -> f32 {
        (value - self.mean[channel]) / self.std[channel]
    }

    /// `value * std + mean` for one channel.
    #[inline]
    #[must_use]
    pub fn denormalize(&self, channel: usize, value: f32) -> f32 {
        value * self.std[channel] + self.mean[channel]
    }

    /// Normalize one row of all channels.
    #[must_use]
    pub fn normalize_row(&self, row: &[f32; N_CHANNELS]) -> [f32; N_CHANNELS] {
        let mut out = [0.0; N_CHANNELS];
        for (c, v) in row.iter().enumerate() {
            out[c] = self.normalize(c, *v);
        }
        out
    }

    /// Map normalized temperature values back to degrees.
    #[must_use]
    pub fn denormalize_target(&self, values: &[f32]) -> Vec<f32> {
        values
            .iter()
            .map(|&v| self.denormalize(TARGET_CHANNEL, v))
            .collect()
    }

    /// Mean of the target channel.
    #[must_use]
    pub fn target_mean(&self) -> f32 {
        self.mean[TARGET_CHANNEL]
    }

    /// Standard deviation of the target channel.
    #[must_use]
    pub fn target_std(&self) -> f32 {
        self.std[TARGET_CHANNEL]
    }
}

impl Default for NormalizationStats {
    fn default() -> Self {
        Self::identity()
    }
}
