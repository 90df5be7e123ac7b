//! Experiment configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tempcast_core::WindowConfig;
use tempcast_models::TimeSeriesTransformerConfig;
use tempcast_train::TrainerConfig;

use crate::error::ConfigError;

/// Window, model and trainer settings for one experiment.
///
/// Serialized as JSON. Missing sections and fields take their defaults, so
/// a file only needs the values it changes:
///
/// ```json
/// { "trainer": { "epochs": 5 }, "window": { "input_window": 168 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Windowing and split.
    pub window: WindowConfig,
    /// Network hyperparameters.
    pub model: TimeSeriesTransformerConfig,
    /// Optimization settings.
    pub trainer: TrainerConfig,
}

impl ExperimentConfig {
    /// Set the window settings. The model horizon follows the output window.
    #[must_use]
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self.model.output_window = window.output_window;
        self
    }

    /// Set the model settings.
    #[must_use]
    pub fn with_model(mut self, model: TimeSeriesTransformerConfig) -> Self {
        self.model = model;
        self
    }

    /// Set the trainer settings.
    #[must_use]
    pub fn with_trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = trainer;
        self
    }

    /// Check every section and their agreement with each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate()?;
        self.model.validate()?;
        self.trainer.validate()?;
        if self.model.output_window != self.window.output_window {
            return Err(ConfigError::Invalid(format!(
                "model.output_window ({}) must equal window.output_window ({})",
                self.model.output_window, self.window.output_window
            )));
        }
        if self.window.input_window > self.model.max_len {
            return Err(ConfigError::Invalid(format!(
                "window.input_window ({}) exceeds model.max_len ({})",
                self.window.input_window, self.model.max_len
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as pretty-printed JSON.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.window.input_window, 96);
        assert_eq!(config.model.output_window, config.window.output_window);
        assert_eq!(config.trainer.batch_size, 256);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = ExperimentConfig::from_json_str(
            r#"{ "trainer": { "epochs": 5 }, "window": { "input_window": 168 } }"#,
        )
        .unwrap();
        assert_eq!(config.trainer.epochs, 5);
        assert_eq!(config.trainer.batch_size, 256);
        assert_eq!(config.window.input_window, 168);
        assert_eq!(config.window.output_window, 72);
        assert_eq!(config.model.d_model, 48);
    }

    #[test]
    fn test_horizon_mismatch_rejected() {
        let err = ExperimentConfig::from_json_str(r#"{ "window": { "output_window": 24 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = ExperimentConfig::default().with_window(WindowConfig::new(48, 24));
        config.validate().unwrap();
        assert_eq!(config.model.output_window, 24);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.json");
        let config = ExperimentConfig::default()
            .with_trainer(TrainerConfig::default().with_epochs(3).with_checkpoint_dir("ckpt"));

        config.to_json_file(&path).unwrap();
        assert_eq!(ExperimentConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = ExperimentConfig::from_json_file("/nonexistent/experiment.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
