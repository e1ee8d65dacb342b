use metar_core::{AppError, NetworkError};
use serde::{Deserialize, Serialize};

use crate::metar::ParseError;

/// Airport the reports are fetched for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Airport {
    /// Display name, used as the sensor name prefix
    pub name: String,
    /// Station identifier, upper-case (e.g. `EHAM`)
    pub code: String,
}

impl Airport {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into().trim().to_ascii_uppercase(),
        }
    }
}

/// Measurements a METAR sensor can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Time,
    Weather,
    Temperature,
    Dewpoint,
    Humidity,
    Wind,
    WindSpeed,
    WindDirection,
    Pressure,
    Visibility,
    Precipitation,
    Sky,
}

impl SensorKind {
    pub const ALL: [SensorKind; 12] = [
        SensorKind::Time,
        SensorKind::Weather,
        SensorKind::Temperature,
        SensorKind::Dewpoint,
        SensorKind::Humidity,
        SensorKind::Wind,
        SensorKind::WindSpeed,
        SensorKind::WindDirection,
        SensorKind::Pressure,
        SensorKind::Visibility,
        SensorKind::Precipitation,
        SensorKind::Sky,
    ];

    /// Configuration key
    pub fn key(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Weather => "weather",
            Self::Temperature => "temperature",
            Self::Dewpoint => "dewpoint",
            Self::Humidity => "humidity",
            Self::Wind => "wind",
            Self::WindSpeed => "wind_speed",
            Self::WindDirection => "wind_direction",
            Self::Pressure => "pressure",
            Self::Visibility => "visibility",
            Self::Precipitation => "precipitation",
            Self::Sky => "sky",
        }
    }

    /// Display label, appended to the airport name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Time => "Updated",
            Self::Weather => "Condition",
            Self::Temperature => "Temperature",
            Self::Dewpoint => "Dewpoint",
            Self::Humidity => "Humidity",
            Self::Wind => "Wind",
            Self::WindSpeed => "Wind speed",
            Self::WindDirection => "Wind direction",
            Self::Pressure => "Pressure",
            Self::Visibility => "Visibility",
            Self::Precipitation => "Precipitation",
            Self::Sky => "Sky",
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Temperature | Self::Dewpoint => Some("C"),
            Self::Humidity => Some("%"),
            Self::WindSpeed => Some("km/h"),
            Self::WindDirection => Some("°"),
            Self::Pressure => Some("hPa"),
            Self::Visibility => Some("m"),
            Self::Precipitation => Some("mm"),
            Self::Time | Self::Weather | Self::Wind | Self::Sky => None,
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// METAR fetch errors
#[derive(Debug, thiserror::Error)]
pub enum MetarError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("No report for {0} in response")]
    NoReport(String),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl From<MetarError> for AppError {
    fn from(e: MetarError) -> Self {
        match e {
            MetarError::Network(n) => AppError::Network(n),
            other => AppError::platform(crate::platform::PLATFORM, other),
        }
    }
}
