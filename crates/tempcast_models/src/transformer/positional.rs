//! Fixed sinusoidal positional encoding.

use burn::nn::{Dropout, DropoutConfig};
use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::{ModelError, Result};

/// Rows in the positional table unless configured otherwise.
pub const DEFAULT_MAX_LEN: usize = 5000;

/// Build the `max_len x d_model` sinusoidal table, row-major.
///
/// Entry `(pos, 2k)` is `sin(pos / 10000^(2k / d_model))` and entry
/// `(pos, 2k + 1)` is the matching cosine.
#[must_use]
pub fn sinusoidal_table(max_len: usize, d_model: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; max_len * d_model];
    for pos in 0..max_len {
        for i in 0..d_model {
            let exponent = (2 * (i / 2)) as f64 / d_model as f64;
            let angle = pos as f64 / 10000f64.powf(exponent);
            table[pos * d_model + i] = if i % 2 == 0 { angle.sin() } else { angle.cos() } as f32;
        }
    }
    table
}

/// Adds position information to an embedded sequence.
///
/// The table is computed once at construction and never trained. Dropout
/// after the addition only fires on an autodiff backend, so inference on
/// the plain backend (or after [`AutodiffModule::valid`]) is deterministic.
///
/// [`AutodiffModule::valid`]: burn::module::AutodiffModule::valid
#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    /// Constant `[max_len, d_model]` table.
    table: Tensor<B, 2>,
    dropout: Dropout,
    #[module(skip)]
    max_len: usize,
    #[module(skip)]
    d_model: usize,
}

impl<B: Backend> PositionalEncoding<B> {
    /// Create the encoding for embeddings of width `d_model`.
    pub fn new(d_model: usize, max_len: usize, dropout: f64, device: &B::Device) -> Self {
        let table = Tensor::from_data(
            TensorData::new(sinusoidal_table(max_len, d_model), [max_len, d_model]),
            device,
        );
        Self {
            table,
            dropout: DropoutConfig::new(dropout).init(),
            max_len,
            d_model,
        }
    }

    /// Maximum supported sequence length.
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// The first `len` rows of the table, `[len, d_model]`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SequenceTooLong`] if `len > max_len`.
    pub fn rows(&self, len: usize) -> Result<Tensor<B, 2>> {
        if len > self.max_len {
            return Err(ModelError::SequenceTooLong {
                length: len,
                max_len: self.max_len,
            });
        }
        Ok(self.table.clone().slice([0..len, 0..self.d_model]))
    }

    /// Add the encoding to `x` of shape `[batch, len, d_model]`, then apply dropout.
    ///
    /// # Errors
    ///
    /// Fails if the sequence is longer than the table or the embedding
    /// width differs from `d_model`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let [_, len, d_model] = x.dims();
        if d_model != self.d_model {
            return Err(ModelError::ShapeMismatch {
                expected: format!("[batch, len, {}]", self.d_model),
                got: x.dims().to_vec(),
            });
        }
        let pe = self.rows(len)?;
        Ok(self.dropout.forward(x + pe.unsqueeze::<3>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_table_values() {
        let d = 8;
        let table = sinusoidal_table(10, d);
        // pos 0: sin(0) = 0, cos(0) = 1
        for i in 0..d {
            let expected = if i % 2 == 0 { 0.0 } else { 1.0 };
            assert!((table[i] - expected).abs() < 1e-6);
        }
        // pos 3, k = 1: angle = 3 / 10000^(2/8)
        let angle = 3.0f64 / 10000f64.powf(0.25);
        assert!((table[3 * d + 2] - angle.sin() as f32).abs() < 1e-6);
        assert!((table[3 * d + 3] - angle.cos() as f32).abs() < 1e-6);
    }

    #[test]
    fn test_forward_adds_table() {
        let device = Default::default();
        let pe = PositionalEncoding::<TestBackend>::new(4, 16, 0.1, &device);
        let x = Tensor::<TestBackend, 3>::zeros([2, 5, 4], &device);

        let out = pe.forward(x).unwrap();
        assert_eq!(out.dims(), [2, 5, 4]);

        // No autodiff, so dropout is inactive and the output is the table itself.
        let values = out.into_data().to_vec::<f32>().unwrap();
        let table = sinusoidal_table(16, 4);
        assert_eq!(&values[..20], &table[..20]);
        assert_eq!(&values[20..], &table[..20]);
    }

    #[test]
    fn test_too_long_sequence() {
        let device = Default::default();
        let pe = PositionalEncoding::<TestBackend>::new(4, 8, 0.0, &device);
        let x = Tensor::<TestBackend, 3>::zeros([1, 9, 4], &device);

        let err = pe.forward(x).unwrap_err();
        assert!(matches!(err, ModelError::SequenceTooLong { length: 9, max_len: 8 }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_width_mismatch() {
        let device = Default::default();
        let pe = PositionalEncoding::<TestBackend>::new(4, 8, 0.0, &device);
        let x = Tensor::<TestBackend, 3>::zeros([1, 3, 6], &device);
        assert!(matches!(pe.forward(x), Err(ModelError::ShapeMismatch { .. })));
    }
}
