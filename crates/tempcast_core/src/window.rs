//! Window lengths and the temporal train/test ratio.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default input window (hours of history fed to the model).
pub const DEFAULT_INPUT_WINDOW: usize = 96;

/// One week of hourly history. Older weather exports were windowed with
/// this length; checkpoints trained on it need the matching setting.
pub const WEEKLY_INPUT_WINDOW: usize = 168;

/// Default forecast horizon in hours.
pub const DEFAULT_OUTPUT_WINDOW: usize = 72;

/// Fraction of rows (by index) assigned to the training split.
pub const DEFAULT_SPLIT_RATIO: f64 = 0.8;

/// Windowing settings shared by the dataset, the trainer and the predictor.
///
/// # Example
///
/// ```rust
/// use tempcast_core::WindowConfig;
///
/// let cfg = WindowConfig::default();
/// assert_eq!(cfg.span(), 96 + 72);
/// assert_eq!(cfg.split_index(1000), 800);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Time steps of model input.
    pub input_window: usize,
    /// Time steps of temperature to forecast.
    pub output_window: usize,
    /// Train fraction of the series, in `(0, 1)`.
    pub split_ratio: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            input_window: DEFAULT_INPUT_WINDOW,
            output_window: DEFAULT_OUTPUT_WINDOW,
            split_ratio: DEFAULT_SPLIT_RATIO,
        }
    }
}

impl WindowConfig {
    /// Create a config with the given window lengths and the default ratio.
    #[must_use]
    pub fn new(input_window: usize, output_window: usize) -> Self {
        Self {
            input_window,
            output_window,
            ..Default::default()
        }
    }

    /// Set the input window.
    #[must_use]
    pub fn with_input_window(mut self, input_window: usize) -> Self {
        self.input_window = input_window;
        self
    }

    /// Set the output window.
    #[must_use]
    pub fn with_output_window(mut self, output_window: usize) -> Self {
        self.output_window = output_window;
        self
    }

    /// Set the train fraction.
    #[must_use]
    pub fn with_split_ratio(mut self, split_ratio: f64) -> Self {
        self.split_ratio = split_ratio;
        self
    }

    /// Rows covered by one example (input plus target).
    #[must_use]
    pub const fn span(&self) -> usize {
        self.input_window + self.output_window
    }

    /// First row index of the test split: `floor(total_rows * split_ratio)`.
    #[must_use]
    pub fn split_index(&self, total_rows: usize) -> usize {
        (total_rows as f64 * self.split_ratio).floor() as usize
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.input_window == 0 {
            return Err(CoreError::InvalidConfig(
                "input_window must be greater than 0".to_string(),
            ));
        }
        if self.output_window == 0 {
            return Err(CoreError::InvalidConfig(
                "output_window must be greater than 0".to_string(),
            ));
        }
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(CoreError::InvalidConfig(format!(
                "split_ratio must be in (0, 1), got {}",
                self.split_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = WindowConfig::default();
        assert_eq!(cfg.input_window, 96);
        assert_eq!(cfg.output_window, 72);
        assert_eq!(cfg.split_ratio, 0.8);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_split_index_floors() {
        let cfg = WindowConfig::default();
        assert_eq!(cfg.split_index(1000), 800);
        assert_eq!(cfg.split_index(1001), 800);
        assert_eq!(cfg.split_index(1004), 803);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(WindowConfig::new(0, 72).validate().is_err());
        assert!(WindowConfig::new(96, 0).validate().is_err());
        assert!(WindowConfig::default().with_split_ratio(1.0).validate().is_err());
        assert!(WindowConfig::default().with_split_ratio(f64::NAN).validate().is_err());
    }
}
