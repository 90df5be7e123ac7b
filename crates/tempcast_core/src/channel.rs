//! Input channels and their fixed ordering.

use serde::{Deserialize, Serialize};

/// Number of input channels.
pub const N_CHANNELS: usize = 4;

/// Index of the forecast target (temperature) in [`CHANNELS`].
pub const TARGET_CHANNEL: usize = 0;

/// One of the four weather channels the model consumes.
///
/// The discriminant is the column index in every model input. Reordering
/// these variants invalidates every trained checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Air temperature (°C). The forecast target.
    Temperature = 0,
    /// Relative humidity (%).
    RelativeHumidity = 1,
    /// Wind speed at 10 m (km/h).
    WindSpeed = 2,
    /// Mean sea-level pressure (hPa).
    Pressure = 3,
}

/// All channels in model order.
pub const CHANNELS: [Channel; N_CHANNELS] = [
    Channel::Temperature,
    Channel::RelativeHumidity,
    Channel::WindSpeed,
    Channel::Pressure,
];

impl Channel {
    /// Column index in model inputs.
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Canonical CSV header for this channel.
    #[must_use]
    pub const fn column_name(&self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::RelativeHumidity => "relative_humidity",
            Channel::WindSpeed => "wind_speed_10m (km/h)",
            Channel::Pressure => "pressure_msl (hPa)",
        }
    }

    /// Header spellings accepted for this channel, canonical name first.
    ///
    /// Open-Meteo exports use the unit-suffixed names; hand-made files
    /// often drop the suffix.
    #[must_use]
    pub const fn column_aliases(&self) -> &'static [&'static str] {
        match self {
            Channel::Temperature => &["temperature", "temperature_2m (°C)", "temperature_2m"],
            Channel::RelativeHumidity => &[
                "relative_humidity",
                "relative_humidity_2m (%)",
                "relative_humidity_2m",
            ],
            Channel::WindSpeed => &["wind_speed_10m (km/h)", "wind_speed_10m", "wind_speed"],
            Channel::Pressure => &["pressure_msl (hPa)", "pressure_msl", "pressure"],
        }
    }

    /// Check whether a CSV header names this channel.
    ///
    /// Comparison ignores surrounding whitespace and ASCII case.
    #[must_use]
    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim();
        self.column_aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(header))
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}
