//! Temporal train/test splits.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::window::WindowConfig;

/// Which side of the temporal boundary a dataset covers.
///
/// Splits are by row index, never random: the training rows all precede
/// the test rows, so no future value leaks into training.
///
/// # Example
///
/// ```rust
/// use tempcast_core::{Split, WindowConfig};
///
/// let cfg = WindowConfig::default();
/// assert_eq!(Split::Train.row_range(1000, &cfg).unwrap(), 0..800);
/// // The test split re-includes one full window of history before the boundary.
/// assert_eq!(Split::Test.row_range(1000, &cfg).unwrap(), 632..1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Split {
    /// Rows `[0, split_index)`.
    #[default]
    Train,
    /// Rows `[split_index - input_window - output_window, total)`.
    Test,
}

impl Split {
    /// Check if this is the training split.
    #[must_use]
    pub const fn is_train(&self) -> bool {
        matches!(self, Split::Train)
    }

    /// Check if this is the test split.
    #[must_use]
    pub const fn is_test(&self) -> bool {
        matches!(self, Split::Test)
    }

    /// Source rows for this split out of `total_rows`.
    ///
    /// # Errors
    ///
    /// For [`Split::Test`], fails when the training part is shorter than one
    /// window span, since the overlap would start before row 0.
    pub fn row_range(&self, total_rows: usize, config: &WindowConfig) -> Result<Range<usize>> {
        let split_idx = config.split_index(total_rows);
        match self {
            Split::Train => Ok(0..split_idx),
            Split::Test => {
                let span = config.span();
                if split_idx < span {
                    return Err(CoreError::InsufficientRows {
                        required: span,
                        available: split_idx,
                    });
                }
                Ok(split_idx - span..total_rows)
            }
        }
    }

    /// Number of windows this split yields, or 0 when it is too short.
    ///
    /// A split of `n` rows yields `n - input_window - output_window` windows.
    #[must_use]
    pub fn window_count(&self, total_rows: usize, config: &WindowConfig) -> usize {
        self.row_range(total_rows, config)
            .map(|rows| rows.len().saturating_sub(config.span()))
            .unwrap_or(0)
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test => write!(f, "test"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_window_count_matches_formula() {
        let cfg = WindowConfig::default();
        for total in [0usize, 100, 209, 210, 211, 1000, 8760] {
            let expected = (cfg.split_index(total) as i64 - 168).max(0) as usize;
            assert_eq!(Split::Train.window_count(total, &cfg), expected, "T = {total}");
        }
    }

    #[test]
    fn test_test_split_overlaps_boundary() {
        let cfg = WindowConfig::new(4, 2);
        let range = Split::Test.row_range(20, &cfg).unwrap();
        assert_eq!(range, 10..20);
        assert_eq!(Split::Test.window_count(20, &cfg), 4);
    }

    #[test]
    fn test_test_split_too_short() {
        let cfg = WindowConfig::default();
        assert!(Split::Test.row_range(100, &cfg).is_err());
        assert_eq!(Split::Test.window_count(100, &cfg), 0);
    }

    #[test]
    fn test_split_display() {
        assert_eq!(Split::Train.to_string(), "train");
        assert_eq!(Split::Test.to_string(), "test");
    }
}
