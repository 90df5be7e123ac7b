//! Test-split evaluation in original units.

use burn::prelude::*;
use serde::{Deserialize, Serialize};
use tempcast_data::{WindowLoader, WindowedSeriesDataset};
use tempcast_models::TimeSeriesTransformer;

use crate::error::{Result, TrainError};

/// Error metrics over a whole split, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Mean absolute error.
    pub mae: f32,
    /// Root mean squared error.
    pub rmse: f32,
    /// Windows evaluated.
    pub n_windows: usize,
    /// Denormalized forecast for the first window.
    pub first_prediction: Vec<f32>,
    /// Denormalized ground truth for the first window.
    pub first_target: Vec<f32>,
}

/// Mean absolute error between two equally long slices.
pub fn mean_absolute_error(preds: &[f32], targets: &[f32]) -> f32 {
    if preds.is_empty() {
        return 0.0;
    }
    let sum: f64 = preds
        .iter()
        .zip(targets)
        .map(|(p, t)| f64::from((p - t).abs()))
        .sum();
    (sum / preds.len() as f64) as f32
}

/// Root mean squared error between two equally long slices.
pub fn root_mean_squared_error(preds: &[f32], targets: &[f32]) -> f32 {
    if preds.is_empty() {
        return 0.0;
    }
    let sum: f64 = preds
        .iter()
        .zip(targets)
        .map(|(p, t)| f64::from(p - t).powi(2))
        .sum();
    (sum / preds.len() as f64).sqrt() as f32
}

/// Run `model` over every window of `dataset` one at a time and score the
/// denormalized forecasts against the denormalized targets.
///
/// Pass an inference-mode model (a plain backend, or `.valid()` of an
/// autodiff one) so dropout is off.
pub fn evaluate<B: Backend>(
    model: &TimeSeriesTransformer<B>,
    dataset: &WindowedSeriesDataset,
    device: &B::Device,
) -> Result<EvaluationReport> {
    let stats = dataset.stats();
    let loader = WindowLoader::builder(dataset).batch_size(1).build()?;

    let mut preds = Vec::with_capacity(dataset.len() * dataset.config().output_window);
    let mut targets = Vec::with_capacity(preds.capacity());
    let mut first_prediction = Vec::new();
    let mut first_target = Vec::new();

    for (i, batch) in loader.iter::<B>(device).enumerate() {
        let batch = batch?;
        let pred = to_vec(model.forward(batch.x)?)?;
        let target = to_vec(batch.y)?;

        let pred = stats.denormalize_target(&pred);
        let target = stats.denormalize_target(&target);
        if i == 0 {
            first_prediction.clone_from(&pred);
            first_target.clone_from(&target);
        }
        preds.extend(pred);
        targets.extend(target);
    }

    let report = EvaluationReport {
        mae: mean_absolute_error(&preds, &targets),
        rmse: root_mean_squared_error(&preds, &targets),
        n_windows: dataset.len(),
        first_prediction,
        first_target,
    };
    tracing::info!(
        "Evaluated {} {} windows: MAE {:.4}, RMSE {:.4}",
        report.n_windows,
        dataset.split(),
        report.mae,
        report.rmse
    );
    Ok(report)
}

fn to_vec<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| TrainError::Tensor(format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use tempcast_core::WindowConfig;
    use tempcast_data::WeatherSeries;
    use tempcast_models::TimeSeriesTransformerConfig;

    type TestBackend = NdArray;

    #[test]
    fn test_metrics() {
        let preds = [1.0, 2.0, 3.0, 4.0];
        let targets = [1.0, 1.0, 5.0, 4.0];
        assert!((mean_absolute_error(&preds, &targets) - 0.75).abs() < 1e-6);
        // sqrt((0 + 1 + 4 + 0) / 4)
        assert!((root_mean_squared_error(&preds, &targets) - 1.25f32.sqrt()).abs() < 1e-6);
        assert_eq!(mean_absolute_error(&[], &[]), 0.0);
    }

    #[test]
    fn test_evaluate_test_split() {
        let rows = (0..150)
            .map(|i| {
                let t = i as f32;
                [12.0 + (t / 5.0).sin() * 3.0, 70.0, 4.0 + t % 3.0, 1009.0]
            })
            .collect();
        let series = WeatherSeries::from_rows(rows);
        let (_, test) = WindowedSeriesDataset::train_test(&series, WindowConfig::new(10, 5)).unwrap();

        let device = Default::default();
        let model = TimeSeriesTransformerConfig::new(5)
            .with_d_model(8)
            .with_nhead(2)
            .with_d_ff(16)
            .init::<TestBackend>(&device)
            .unwrap();

        let report = evaluate(&model, &test, &device).unwrap();
        // test rows 120 - 15 .. 150 = 45 rows -> 30 windows
        assert_eq!(report.n_windows, 30);
        assert_eq!(report.first_prediction.len(), 5);
        assert!(report.mae.is_finite() && report.mae > 0.0);
        assert!(report.rmse >= report.mae);

        // First target is the raw temperature right after the first input window.
        let expected = 12.0 + (115.0f32 / 5.0).sin() * 3.0;
        assert!((report.first_target[0] - expected).abs() < 1e-3);
    }
}
