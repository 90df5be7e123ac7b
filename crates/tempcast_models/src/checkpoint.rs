//! Checkpoint persistence.
//!
//! A checkpoint is two files sharing a stem:
//!
//! - `<dir>/<name>.mpk`: every parameter, written with Burn's
//!   [`NamedMpkFileRecorder`] at full precision
//! - `<dir>/<name>.json`: [`CheckpointMetadata`] with the model
//!   configuration and the training-split normalization statistics
//!
//! Loading reads the metadata first and refuses to touch the weights when
//! the stored architecture differs from the one the caller expects. After
//! the weights are read, every parameter shape must match the model the
//! metadata describes.
//!
//! # Example
//!
//! ```rust,ignore
//! use tempcast_models::checkpoint::{save_checkpoint, load_checkpoint};
//!
//! save_checkpoint(&model, &metadata, "checkpoints", "final_transformer_model")?;
//! let (model, metadata) =
//!     load_checkpoint::<NdArray>("checkpoints", "final_transformer_model", None, &device)?;
//! ```

use std::path::{Path, PathBuf};

use burn::module::{Module, ModuleVisitor, ParamId};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use serde::{Deserialize, Serialize};
use tempcast_core::{NormalizationStats, WindowConfig};

use crate::error::{ModelError, Result};
use crate::transformer::{TimeSeriesTransformer, TimeSeriesTransformerConfig};

/// Architecture tag stored in every checkpoint.
pub const ARCHITECTURE: &str = "TimeSeriesTransformer";

/// File stem used when none is given.
pub const DEFAULT_CHECKPOINT_NAME: &str = "final_transformer_model";

/// Directory used when none is given.
pub const DEFAULT_CHECKPOINT_DIR: &str = "checkpoints";

const WEIGHTS_EXTENSION: &str = "mpk";
const METADATA_EXTENSION: &str = "json";

/// Everything needed to rebuild and serve a trained model besides its weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Model architecture name.
    pub arch: String,
    /// Model hyperparameters.
    pub model: TimeSeriesTransformerConfig,
    /// Window lengths and split ratio used in training.
    pub window: WindowConfig,
    /// Training-split statistics for normalizing inputs and denormalizing output.
    pub stats: NormalizationStats,
    /// Epochs completed.
    pub epochs: usize,
    /// Mean loss of the last epoch.
    pub final_loss: Option<f32>,
}

impl CheckpointMetadata {
    /// Create metadata for a freshly trained model.
    pub fn new(
        model: TimeSeriesTransformerConfig,
        window: WindowConfig,
        stats: NormalizationStats,
    ) -> Self {
        Self {
            arch: ARCHITECTURE.to_string(),
            model,
            window,
            stats,
            epochs: 0,
            final_loss: None,
        }
    }

    /// Set the number of completed epochs.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the final training loss.
    #[must_use]
    pub fn with_final_loss(mut self, loss: f32) -> Self {
        self.final_loss = Some(loss);
        self
    }

    /// Check the stored settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.arch != ARCHITECTURE {
            return Err(ModelError::ArchitectureMismatch {
                expected: ARCHITECTURE.to_string(),
                found: self.arch.clone(),
            });
        }
        self.model.validate()?;
        self.window.validate()?;
        self.stats.validate()?;
        if self.window.output_window != self.model.output_window {
            return Err(ModelError::InvalidConfig(format!(
                "window output_window ({}) differs from model output_window ({})",
                self.window.output_window, self.model.output_window
            )));
        }
        if self.window.input_window > self.model.max_len {
            return Err(ModelError::SequenceTooLong {
                length: self.window.input_window,
                max_len: self.model.max_len,
            });
        }
        Ok(())
    }

    /// Save metadata to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load metadata from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::CheckpointNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// File locations of one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPaths {
    /// Stem passed to the recorder, which appends `.mpk`.
    stem: PathBuf,
}

impl CheckpointPaths {
    /// Paths for checkpoint `name` inside `dir`.
    ///
    /// `name` is a bare stem; an extension in it would be replaced.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            stem: dir.as_ref().join(name),
        }
    }

    /// Path of the weights blob.
    #[must_use]
    pub fn weights(&self) -> PathBuf {
        self.stem.with_extension(WEIGHTS_EXTENSION)
    }

    /// Path of the metadata file.
    #[must_use]
    pub fn metadata(&self) -> PathBuf {
        self.stem.with_extension(METADATA_EXTENSION)
    }

    /// True when both files exist.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.weights().exists() && self.metadata().exists()
    }
}

/// Save model weights and metadata, creating `dir` if needed.
pub fn save_checkpoint<B: Backend>(
    model: &TimeSeriesTransformer<B>,
    metadata: &CheckpointMetadata,
    dir: impl AsRef<Path>,
    name: &str,
) -> Result<CheckpointPaths> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let paths = CheckpointPaths::new(dir, name);

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(paths.stem.clone(), &recorder)
        .map_err(|e| ModelError::Save(e.to_string()))?;
    metadata.save(paths.metadata())?;

    tracing::info!(
        "Saved checkpoint to {} ({} parameters)",
        paths.weights().display(),
        model.num_params()
    );
    Ok(paths)
}

/// Load a checkpoint.
///
/// When `expected` is given, the stored model configuration must equal it.
///
/// # Errors
///
/// - [`ModelError::CheckpointNotFound`] if either file is missing
/// - [`ModelError::ArchitectureMismatch`] if the stored architecture or
///   configuration differs from `expected`, or the weights do not have the
///   shapes the stored configuration calls for
/// - [`ModelError::Load`] if the weights cannot be decoded
pub fn load_checkpoint<B: Backend>(
    dir: impl AsRef<Path>,
    name: &str,
    expected: Option<&TimeSeriesTransformerConfig>,
    device: &B::Device,
) -> Result<(TimeSeriesTransformer<B>, CheckpointMetadata)> {
    let paths = CheckpointPaths::new(dir, name);
    let metadata = CheckpointMetadata::load(paths.metadata())?;
    if !paths.weights().exists() {
        return Err(ModelError::CheckpointNotFound(paths.weights()));
    }

    if let Some(expected) = expected {
        if expected != &metadata.model {
            return Err(ModelError::ArchitectureMismatch {
                expected: describe(expected),
                found: describe(&metadata.model),
            });
        }
    }
    metadata.validate()?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let model = metadata.model.init::<B>(device)?;
    let declared = param_shapes(&model);
    let model = model
        .load_file(paths.stem.clone(), &recorder, device)
        .map_err(|e| ModelError::Load(e.to_string()))?;
    check_shapes(&declared, &param_shapes(&model))?;

    tracing::debug!("Loaded checkpoint from {}", paths.weights().display());
    Ok((model, metadata))
}

/// Collects the shape of every float parameter in visit order.
#[derive(Default)]
struct ParamShapes {
    shapes: Vec<Vec<usize>>,
}

impl<B: Backend> ModuleVisitor<B> for ParamShapes {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.shapes.push(tensor.dims().to_vec());
    }
}

fn param_shapes<B: Backend>(model: &TimeSeriesTransformer<B>) -> Vec<Vec<usize>> {
    let mut visitor = ParamShapes::default();
    model.visit(&mut visitor);
    visitor.shapes
}

fn check_shapes(declared: &[Vec<usize>], loaded: &[Vec<usize>]) -> Result<()> {
    if declared.len() != loaded.len() {
        return Err(ModelError::ArchitectureMismatch {
            expected: format!("{} parameter tensors", declared.len()),
            found: format!("{} parameter tensors", loaded.len()),
        });
    }
    match declared.iter().zip(loaded).position(|(d, l)| d != l) {
        Some(i) => Err(ModelError::ArchitectureMismatch {
            expected: format!("parameter {i} with shape {:?}", declared[i]),
            found: format!("parameter {i} with shape {:?}", loaded[i]),
        }),
        None => Ok(()),
    }
}

fn describe(config: &TimeSeriesTransformerConfig) -> String {
    serde_json::to_string(config).unwrap_or_else(|_| format!("{config:?}"))
}
