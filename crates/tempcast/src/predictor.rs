//! Serving trained checkpoints.
//!
//! [`Predictor`] owns a loaded model and its training statistics and turns
//! the tail of a live series into a forecast. [`LazyPredictor`] defers the
//! load to the first request and guarantees it happens once even when many
//! threads ask at the same time.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use burn::prelude::*;
use burn::tensor::TensorData;
use parking_lot::Mutex;
use tempcast_core::{NormalizationStats, N_CHANNELS};
use tempcast_data::WeatherSeries;
use tempcast_models::{load_checkpoint, CheckpointMetadata, TimeSeriesTransformer, TimeSeriesTransformerConfig};

use crate::error::PredictError;

type Result<T> = std::result::Result<T, PredictError>;

/// Temperature forecast in original units, one value per hour.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    values: Vec<f32>,
}

impl Forecast {
    /// Forecast values. Index `i` is the hour starting `i` hours from now,
    /// so index 0 is the current hour.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Horizon length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the forecast is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the values.
    pub fn iter(&self) -> std::slice::Iter<'_, f32> {
        self.values.iter()
    }

    /// Take the values.
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}

impl From<Forecast> for Vec<f32> {
    fn from(forecast: Forecast) -> Self {
        forecast.values
    }
}

/// A loaded model ready to forecast.
///
/// Inputs are always normalized with the statistics stored in the
/// checkpoint, never with statistics of the live data.
///
/// The model lives behind a mutex because Burn parameters are not `Sync`.
/// Each call holds the lock only long enough to clone the model handle,
/// which shares the weight buffers, so concurrent forecasts run in parallel.
pub struct Predictor<B: Backend> {
    model: Mutex<TimeSeriesTransformer<B>>,
    metadata: CheckpointMetadata,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Wrap an in-memory model with its metadata.
    pub fn new(
        model: TimeSeriesTransformer<B>,
        metadata: CheckpointMetadata,
        device: B::Device,
    ) -> Result<Self> {
        metadata.validate().map_err(PredictError::from_load)?;
        Ok(Self {
            model: Mutex::new(model),
            metadata,
            device,
        })
    }

    /// Load checkpoint `name` from `dir`.
    ///
    /// # Errors
    ///
    /// [`PredictError::ModelUnavailable`] when the files are missing or
    /// unreadable, [`PredictError::Configuration`] when the stored settings
    /// are invalid.
    pub fn load(dir: impl AsRef<Path>, name: &str, device: &B::Device) -> Result<Self> {
        Self::load_inner(dir.as_ref(), name, None, device)
    }

    /// Load a checkpoint and require it to match `expected`.
    pub fn load_expecting(
        dir: impl AsRef<Path>,
        name: &str,
        expected: &TimeSeriesTransformerConfig,
        device: &B::Device,
    ) -> Result<Self> {
        Self::load_inner(dir.as_ref(), name, Some(expected), device)
    }

    fn load_inner(
        dir: &Path,
        name: &str,
        expected: Option<&TimeSeriesTransformerConfig>,
        device: &B::Device,
    ) -> Result<Self> {
        let (model, metadata) =
            load_checkpoint::<B>(dir, name, expected, device).map_err(PredictError::from_load)?;
        Self::new(model, metadata, device.clone())
    }

    /// Checkpoint metadata.
    pub fn metadata(&self) -> &CheckpointMetadata {
        &self.metadata
    }

    /// Training-split statistics.
    pub fn stats(&self) -> &NormalizationStats {
        &self.metadata.stats
    }

    /// Rows consumed per forecast.
    pub fn input_window(&self) -> usize {
        self.metadata.window.input_window
    }

    /// Hours forecast.
    pub fn output_window(&self) -> usize {
        self.metadata.window.output_window
    }

    /// Forecast from the most recent rows of `series`.
    pub fn predict(&self, series: &WeatherSeries) -> Result<Forecast> {
        self.predict_rows(series.rows())
    }

    /// Forecast from the last `input_window` rows of a CSV file.
    pub fn predict_csv(&self, path: impl AsRef<Path>) -> Result<Forecast> {
        let series = WeatherSeries::from_csv(path)?;
        self.predict(&series)
    }

    /// Forecast from the most recent rows, given in channel order.
    ///
    /// Only the last `input_window` rows are used.
    ///
    /// # Errors
    ///
    /// [`PredictError::InsufficientData`] if fewer than `input_window` rows
    /// are given, [`PredictError::Prediction`] if the output is not finite.
    pub fn predict_rows(&self, rows: &[[f32; N_CHANNELS]]) -> Result<Forecast> {
        let window = self.input_window();
        if rows.len() < window {
            return Err(PredictError::InsufficientData {
                required: window,
                available: rows.len(),
            });
        }
        let recent = &rows[rows.len() - window..];

        let stats = self.stats();
        let mut input = Vec::with_capacity(window * N_CHANNELS);
        for row in recent {
            if row.iter().any(|v| !v.is_finite()) {
                return Err(PredictError::Prediction(
                    "input contains non-finite values".to_string(),
                ));
            }
            input.extend(stats.normalize_row(row));
        }

        let x = Tensor::<B, 3>::from_data(TensorData::new(input, [1, window, N_CHANNELS]), &self.device);
        let model = self.model.lock().clone();
        let output = model.forward(x).map_err(PredictError::from_forward)?;

        let normalized = output
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| PredictError::Prediction(format!("{e:?}")))?;
        let values = stats.denormalize_target(&normalized);

        if values.iter().any(|v| !v.is_finite()) {
            return Err(PredictError::Prediction(
                "model produced non-finite values".to_string(),
            ));
        }
        Ok(Forecast { values })
    }
}

/// A [`Predictor`] loaded on first use.
///
/// The first call to [`get`](Self::get) (or any predict method) loads the
/// checkpoint; concurrent first callers wait for that single load. A failed
/// load is not cached, so a later call retries once the files exist.
pub struct LazyPredictor<B: Backend> {
    dir: PathBuf,
    name: String,
    device: B::Device,
    predictor: OnceLock<Predictor<B>>,
    init: Mutex<()>,
    loads: AtomicUsize,
}

impl<B: Backend> LazyPredictor<B> {
    /// Create a lazy predictor for checkpoint `name` in `dir`. Nothing is read yet.
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>, device: B::Device) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            device,
            predictor: OnceLock::new(),
            init: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    /// True once the checkpoint has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.predictor.get().is_some()
    }

    /// Number of checkpoint loads attempted, successful or not.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// The loaded predictor, loading it if needed.
    pub fn get(&self) -> Result<&Predictor<B>> {
        if let Some(predictor) = self.predictor.get() {
            return Ok(predictor);
        }

        let _guard = self.init.lock();
        if let Some(predictor) = self.predictor.get() {
            return Ok(predictor);
        }

        self.loads.fetch_add(1, Ordering::SeqCst);
        let predictor = Predictor::load(&self.dir, &self.name, &self.device)?;
        tracing::info!(
            "Loaded model {} from {} (input {}h, horizon {}h)",
            self.name,
            self.dir.display(),
            predictor.input_window(),
            predictor.output_window()
        );
        Ok(self.predictor.get_or_init(|| predictor))
    }

    /// Forecast from the most recent rows of `series`.
    pub fn predict(&self, series: &WeatherSeries) -> Result<Forecast> {
        self.get()?.predict(series)
    }

    /// Forecast from the most recent rows, given in channel order.
    pub fn predict_rows(&self, rows: &[[f32; N_CHANNELS]]) -> Result<Forecast> {
        self.get()?.predict_rows(rows)
    }

    /// Forecast from the tail of a CSV file.
    pub fn predict_csv(&self, path: impl AsRef<Path>) -> Result<Forecast> {
        self.get()?.predict_csv(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictErrorKind;
    use burn_ndarray::NdArray;
    use tempcast_core::WindowConfig;

    type TestBackend = NdArray;

    fn predictor() -> Predictor<TestBackend> {
        let device = Default::default();
        let config = TimeSeriesTransformerConfig::new(6).with_d_model(8).with_nhead(2).with_d_ff(16);
        let model = config.init::<TestBackend>(&device).unwrap();
        let stats = NormalizationStats::new([15.0, 60.0, 4.0, 1010.0], [5.0, 10.0, 2.0, 8.0]).unwrap();
        let metadata = CheckpointMetadata::new(config, WindowConfig::new(12, 6), stats);
        Predictor::new(model, metadata, device).unwrap()
    }

    fn rows(n: usize) -> Vec<[f32; N_CHANNELS]> {
        (0..n).map(|i| [15.0 + i as f32 * 0.1, 60.0, 4.0, 1010.0]).collect()
    }

    #[test]
    fn test_exact_window_succeeds() {
        let forecast = predictor().predict_rows(&rows(12)).unwrap();
        assert_eq!(forecast.len(), 6);
        assert!(forecast.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_short_series_fails() {
        let err = predictor().predict_rows(&rows(11)).unwrap_err();
        assert_eq!(err.kind(), PredictErrorKind::InsufficientData);
        assert!(matches!(err, PredictError::InsufficientData { required: 12, available: 11 }));
    }

    #[test]
    fn test_uses_only_recent_rows() {
        let predictor = predictor();
        let long = rows(40);
        let a = predictor.predict_rows(&long).unwrap();
        let b = predictor.predict_rows(&long[28..]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_finite_input() {
        let mut input = rows(12);
        input[5][2] = f32::NAN;
        let err = predictor().predict_rows(&input).unwrap_err();
        assert_eq!(err.kind(), PredictErrorKind::Prediction);
    }

    #[test]
    fn test_lazy_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let lazy = LazyPredictor::<TestBackend>::new(dir.path(), "absent", Default::default());
        assert!(!lazy.is_loaded());

        let err = lazy.predict_rows(&rows(12)).unwrap_err();
        assert_eq!(err.kind(), PredictErrorKind::ModelUnavailable);
        assert!(!lazy.is_loaded());
        assert_eq!(lazy.load_count(), 1);
    }
}
