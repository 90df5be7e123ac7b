//! Batched iteration over windowed datasets.

use burn::prelude::*;
use burn::tensor::TensorData;
use rand::seq::SliceRandom;
use tempcast_core::{Seed, N_CHANNELS};

use crate::dataset::WindowedSeriesDataset;
use crate::error::{DataError, Result};

/// One batch of examples as Burn tensors.
#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    /// Inputs, `[batch, input_window, channels]`.
    pub x: Tensor<B, 3>,
    /// Normalized temperature targets, `[batch, output_window]`.
    pub y: Tensor<B, 2>,
}

impl<B: Backend> WindowBatch<B> {
    /// Number of examples in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.dims()[0]
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A loader that yields batches from a [`WindowedSeriesDataset`].
///
/// Shuffling only reorders examples inside the dataset; it never mixes
/// train and test rows, which live in separate datasets.
///
/// # Example
///
/// ```rust,ignore
/// let loader = WindowLoader::builder(&train)
///     .batch_size(256)
///     .shuffle(true)
///     .seed(Seed::new(42))
///     .build()?;
///
/// for batch in loader.iter::<NdArray>(&device) {
///     let batch = batch?;
/// }
/// ```
pub struct WindowLoader<'a> {
    dataset: &'a WindowedSeriesDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Seed,
}

impl<'a> WindowLoader<'a> {
    /// Create a new loader builder.
    #[must_use]
    pub fn builder(dataset: &'a WindowedSeriesDataset) -> WindowLoaderBuilder<'a> {
        WindowLoaderBuilder::new(dataset)
    }

    /// Get the dataset.
    #[must_use]
    pub fn dataset(&self) -> &WindowedSeriesDataset {
        self.dataset
    }

    /// Get the batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches per pass.
    #[must_use]
    pub fn n_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Iterate over batches using the loader's own seed.
    #[must_use]
    pub fn iter<B: Backend>(&self, device: &B::Device) -> WindowLoaderIter<'_, B> {
        self.iter_with_seed(device, self.seed)
    }

    /// Iterate over batches with an explicit shuffle seed.
    ///
    /// The trainer passes a per-epoch seed so every epoch sees a different
    /// but reproducible order.
    #[must_use]
    pub fn iter_with_seed<B: Backend>(&self, device: &B::Device, seed: Seed) -> WindowLoaderIter<'_, B> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            indices.shuffle(&mut seed.to_rng());
        }
        WindowLoaderIter {
            dataset: self.dataset,
            device: device.clone(),
            indices,
            batch_size: self.batch_size,
            current_batch: 0,
            n_batches: self.n_batches(),
        }
    }
}

/// Builder for [`WindowLoader`].
pub struct WindowLoaderBuilder<'a> {
    dataset: &'a WindowedSeriesDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Seed,
}

impl<'a> WindowLoaderBuilder<'a> {
    /// Create a new builder.
    #[must_use]
    pub fn new(dataset: &'a WindowedSeriesDataset) -> Self {
        Self {
            dataset,
            batch_size: 32,
            shuffle: false,
            drop_last: false,
            seed: Seed::default(),
        }
    }

    /// Set the batch size.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Enable or disable dropping the last incomplete batch.
    #[must_use]
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Set the shuffle seed.
    #[must_use]
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Build the loader.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch size is zero or the dataset is empty.
    pub fn build(self) -> Result<WindowLoader<'a>> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidBatchSize(
                "Batch size must be greater than 0".to_string(),
            ));
        }
        if self.dataset.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        Ok(WindowLoader {
            dataset: self.dataset,
            batch_size: self.batch_size,
            shuffle: self.shuffle,
            drop_last: self.drop_last,
            seed: self.seed,
        })
    }
}

/// Iterator over batches from a [`WindowLoader`].
pub struct WindowLoaderIter<'a, B: Backend> {
    dataset: &'a WindowedSeriesDataset,
    device: B::Device,
    indices: Vec<usize>,
    batch_size: usize,
    current_batch: usize,
    n_batches: usize,
}

impl<B: Backend> Iterator for WindowLoaderIter<'_, B> {
    type Item = Result<WindowBatch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_batch >= self.n_batches {
            return None;
        }

        let start = self.current_batch * self.batch_size;
        let end = (start + self.batch_size).min(self.indices.len());
        self.current_batch += 1;

        Some(self.create_batch(start..end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_batches - self.current_batch;
        (remaining, Some(remaining))
    }
}

impl<B: Backend> ExactSizeIterator for WindowLoaderIter<'_, B> {}

impl<B: Backend> WindowLoaderIter<'_, B> {
    fn create_batch(&self, range: std::ops::Range<usize>) -> Result<WindowBatch<B>> {
        let config = self.dataset.config();
        let (iw, ow) = (config.input_window, config.output_window);
        let batch_size = range.len();

        let mut x_flat = Vec::with_capacity(batch_size * iw * N_CHANNELS);
        let mut y_flat = Vec::with_capacity(batch_size * ow);

        for &idx in &self.indices[range] {
            let (x, y) = self.dataset.get(idx)?;
            x_flat.extend(x.iter().copied());
            y_flat.extend(y.iter().copied());
        }

        let x = Tensor::<B, 3>::from_data(
            TensorData::new(x_flat, [batch_size, iw, N_CHANNELS]),
            &self.device,
        );
        let y = Tensor::<B, 2>::from_data(TensorData::new(y_flat, [batch_size, ow]), &self.device);

        Ok(WindowBatch { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeatherSeries;
    use burn_ndarray::NdArray;
    use tempcast_core::WindowConfig;

    type TestBackend = NdArray;

    fn dataset() -> WindowedSeriesDataset {
        let rows = (0..100)
            .map(|i| {
                let t = i as f32;
                [t.sin(), t.cos(), t * 0.1, 1000.0 + t]
            })
            .collect();
        // 80 train rows, span 10 -> 70 windows
        WindowedSeriesDataset::train(&WeatherSeries::from_rows(rows), WindowConfig::new(6, 4)).unwrap()
    }

    #[test]
    fn test_batch_shapes() {
        let ds = dataset();
        let loader = WindowLoader::builder(&ds).batch_size(32).build().unwrap();
        assert_eq!(loader.n_batches(), 3);

        let device = Default::default();
        let batches: Vec<_> = loader
            .iter::<TestBackend>(&device)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].x.dims(), [32, 6, 4]);
        assert_eq!(batches[0].y.dims(), [32, 4]);
        assert_eq!(batches[2].len(), 70 - 64);
    }

    #[test]
    fn test_drop_last() {
        let ds = dataset();
        let loader = WindowLoader::builder(&ds)
            .batch_size(32)
            .drop_last(true)
            .build()
            .unwrap();
        assert_eq!(loader.n_batches(), 2);
    }

    #[test]
    fn test_unshuffled_order_matches_dataset() {
        let ds = dataset();
        let loader = WindowLoader::builder(&ds).batch_size(1).build().unwrap();
        let device = Default::default();
        let first = loader.iter::<TestBackend>(&device).next().unwrap().unwrap();
        let values = first.y.into_data().to_vec::<f32>().unwrap();
        let (_, y0) = ds.get(0).unwrap();
        assert_eq!(values, y0.to_vec());
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let ds = dataset();
        let loader = WindowLoader::builder(&ds)
            .batch_size(70)
            .shuffle(true)
            .build()
            .unwrap();
        let device = Default::default();
        let take = |seed: u64| {
            loader
                .iter_with_seed::<TestBackend>(&device, Seed::new(seed))
                .next()
                .unwrap()
                .unwrap()
                .y
                .into_data()
                .to_vec::<f32>()
                .unwrap()
        };
        assert_eq!(take(1), take(1));
        assert_ne!(take(1), take(2));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let ds = dataset();
        assert!(matches!(
            WindowLoader::builder(&ds).batch_size(0).build(),
            Err(DataError::InvalidBatchSize(_))
        ));
    }
}
