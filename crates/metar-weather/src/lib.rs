//! METAR airport weather sensors.
//!
//! Fetches the latest report for an airport from the NOAA station files,
//! decodes it, and exposes one sensor entity per configured measurement.

pub mod data;
pub mod metar;
pub mod platform;
pub mod sensor;
pub mod types;

pub use data::{FetchOptions, MetarData, UpdateOutcome};
pub use metar::{Metar, ParseError};
pub use platform::{MetarPlatform, MetarPlatformConfig, PLATFORM};
pub use sensor::{relative_humidity, MetarSensor, MissingField};
pub use types::*;
