//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use tempcast::prelude::*;

pub const HEADER: &str = "time,temperature,relative_humidity,wind_speed_10m (km/h),pressure_msl (hPa)";

/// Hourly rows with a daily cycle on every channel except where overridden.
pub fn synthetic_rows(n: usize, constant_temperature: Option<f32>) -> Vec<[f32; 4]> {
    (0..n)
        .map(|i| {
            let phase = (i as f32) * std::f32::consts::TAU / 24.0;
            let temperature = constant_temperature.unwrap_or(12.0 + 6.0 * phase.sin());
            [
                temperature,
                65.0 + 15.0 * phase.cos(),
                8.0 + 3.0 * (phase * 0.5).sin(),
                1012.0 + 4.0 * (phase / 7.0).cos(),
            ]
        })
        .collect()
}

/// Write rows to `dir/name` as CSV with a leading timestamp column.
pub fn write_csv(dir: &Path, name: &str, rows: &[[f32; 4]]) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for (i, row) in rows.iter().enumerate() {
        writeln!(
            file,
            "2024-01-{:02}T{:02}:00,{},{},{},{}",
            1 + i / 24 % 28,
            i % 24,
            row[0],
            row[1],
            row[2],
            row[3]
        )
        .unwrap();
    }
    path
}

/// A small but complete model for the default 96 -> 72 windows.
pub fn small_model_config() -> TimeSeriesTransformerConfig {
    TimeSeriesTransformerConfig::default()
        .with_d_model(16)
        .with_nhead(4)
        .with_d_ff(64)
}

/// Train briefly and write a checkpoint to `dir` under `name`.
pub fn train_checkpoint(dir: &Path, name: &str) -> (WeatherSeries, CheckpointMetadata) {
    let series = WeatherSeries::from_rows(synthetic_rows(600, None));
    let train = WindowedSeriesDataset::train(&series, WindowConfig::default()).unwrap();
    let trainer = ForecastTrainer::<TrainingBackend>::new(
        TrainerConfig::default()
            .with_batch_size(64)
            .with_checkpoint_dir(dir)
            .with_checkpoint_name(name),
        Default::default(),
    );
    let output = trainer.fit(&small_model_config(), &train).unwrap();
    (series, output.metadata)
}
