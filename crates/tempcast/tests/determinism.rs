//! Seeded training reproducibility.
//!
//! Kept in its own test binary: the backend RNG is process-global, so other
//! tests running in parallel would interleave draws.

mod common;

use tempcast::prelude::*;

use common::{small_model_config, synthetic_rows};

fn run(seed: u64, train: &WindowedSeriesDataset) -> Vec<f32> {
    let trainer = ForecastTrainer::<TrainingBackend>::new(
        TrainerConfig::default().with_batch_size(32).with_seed(seed),
        Default::default(),
    );
    trainer.fit(&small_model_config(), train).unwrap().batch_losses
}

#[test]
fn test_same_seed_same_loss_trajectory() {
    let series = WeatherSeries::from_rows(synthetic_rows(400, None));
    let train = WindowedSeriesDataset::train(&series, WindowConfig::default()).unwrap();

    let first = run(7, &train);
    let second = run(7, &train);
    assert_eq!(first.len(), (320 - 168usize).div_ceil(32));
    assert_eq!(first, second);

    let other = run(8, &train);
    assert_ne!(first, other);
}
