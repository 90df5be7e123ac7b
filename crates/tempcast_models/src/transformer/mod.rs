//! Transformer encoder forecaster.

mod encoder;
mod model;
mod positional;

pub use encoder::EncoderBlock;
pub use model::{Pooling, TimeSeriesTransformer, TimeSeriesTransformerConfig};
pub use positional::{sinusoidal_table, PositionalEncoding, DEFAULT_MAX_LEN};
