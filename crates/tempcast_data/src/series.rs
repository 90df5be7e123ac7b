//! Raw weather series loaded from CSV.

use std::io::Read;
use std::path::Path;

use tempcast_core::{Channel, CHANNELS, N_CHANNELS};

use crate::error::{DataError, Result};

/// An hourly series of `(temperature, humidity, wind speed, pressure)` rows.
///
/// Rows are in chronological order, one per hour, without gaps. Only the
/// four channel columns are read; any other columns (timestamps, extra
/// variables) are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSeries {
    rows: Vec<[f32; N_CHANNELS]>,
}

impl WeatherSeries {
    /// Wrap rows that are already in channel order.
    #[must_use]
    pub fn from_rows(rows: Vec<[f32; N_CHANNELS]>) -> Self {
        Self { rows }
    }

    /// Load a series from a CSV file with a header row.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let series = Self::from_reader(std::io::BufReader::new(file))?;
        tracing::debug!("Loaded {} rows from {:?}", series.len(), path);
        Ok(series)
    }

    /// Load a series from any CSV source with a header row.
    ///
    /// # Errors
    ///
    /// Fails if a channel column is missing or a cell is empty, unparsable
    /// or not finite.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut columns = [0usize; N_CHANNELS];
        for channel in CHANNELS {
            columns[channel.index()] = headers
                .iter()
                .position(|h| channel.matches_header(h))
                .ok_or_else(|| DataError::MissingColumn {
                    column: channel.column_name().to_string(),
                    found: headers.iter().collect::<Vec<_>>().join(", "),
                })?;
        }

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let mut row = [0.0f32; N_CHANNELS];
            for channel in CHANNELS {
                let raw = record.get(columns[channel.index()]).unwrap_or_default();
                row[channel.index()] = parse_cell(raw, channel, i + 2)?;
            }
            rows.push(row);
        }

        Ok(Self { rows })
    }

    /// Number of hourly rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the series has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in channel order.
    #[must_use]
    pub fn rows(&self) -> &[[f32; N_CHANNELS]] {
        &self.rows
    }

    /// The most recent `n` rows, or `None` if the series is shorter.
    #[must_use]
    pub fn tail(&self, n: usize) -> Option<&[[f32; N_CHANNELS]]> {
        self.rows.len().checked_sub(n).map(|start| &self.rows[start..])
    }

    /// Append one hourly row.
    pub fn push(&mut self, row: [f32; N_CHANNELS]) {
        self.rows.push(row);
    }

    /// Values of a single channel.
    #[must_use]
    pub fn column(&self, channel: Channel) -> Vec<f32> {
        self.rows.iter().map(|r| r[channel.index()]).collect()
    }
}

impl From<Vec<[f32; N_CHANNELS]>> for WeatherSeries {
    fn from(rows: Vec<[f32; N_CHANNELS]>) -> Self {
        Self::from_rows(rows)
    }
}

fn parse_cell(raw: &str, channel: Channel, line: usize) -> Result<f32> {
    match raw.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DataError::Parse {
            line,
            column: channel.column_name().to_string(),
            value: raw.to_string(),
        }),
    }
}
