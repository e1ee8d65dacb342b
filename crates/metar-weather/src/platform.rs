//! `metar` sensor platform: config schema and entity registration.

use metar_core::config::parse_options;
use metar_core::{AppError, Entity, EntityRegistry, PlatformOptions, PlatformProvider, ValidationResult};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::data::{FetchOptions, MetarData, DEFAULT_BASE_URL, DEFAULT_MIN_TIME_BETWEEN_UPDATES};
use crate::sensor::MetarSensor;
use crate::types::{Airport, SensorKind};

/// Value of the `platform` key handled here
pub const PLATFORM: &str = "metar";

/// Options of a `platform = "metar"` sensor block
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetarPlatformConfig {
    pub airport_name: String,
    pub airport_code: String,

    /// A single name or a list; unknown names fail deserialization
    #[serde(default, deserialize_with = "one_or_many")]
    pub monitored_conditions: Vec<SensorKind>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds between two successful fetches
    #[serde(default = "default_min_time_between_updates")]
    pub min_time_between_updates: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_min_time_between_updates() -> u64 {
    DEFAULT_MIN_TIME_BETWEEN_UPDATES.as_secs()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<SensorKind>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(SensorKind),
        Many(Vec<SensorKind>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(kind) => vec![kind],
        OneOrMany::Many(kinds) => kinds,
    })
}

impl MetarPlatformConfig {
    pub fn airport(&self) -> Airport {
        Airport::new(self.airport_name.trim(), &self.airport_code)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            base_url: self.base_url.clone(),
            min_time_between_updates: Duration::from_secs(self.min_time_between_updates),
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.airport_name.trim().is_empty() {
            result.add_error("airport_name", "Airport name must not be empty");
        }

        let code = self.airport().code;
        if code.is_empty() {
            result.add_error("airport_code", "Airport code must not be empty");
        } else if !(3..=4).contains(&code.len()) || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            result.add_error(
                "airport_code",
                format!("Expected a 3 or 4 character station identifier, got: {}", code),
            );
        }

        match Url::parse(&self.base_url) {
            Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
                result.add_error(
                    "base_url",
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }
            Ok(url) if url.host().is_none() => {
                result.add_error("base_url", "URL must have a host");
            }
            Ok(_) => {}
            Err(e) => {
                result.add_error("base_url", format!("Invalid URL: {}", e));
            }
        }

        if self.monitored_conditions.is_empty() {
            result.add_warning(
                "monitored_conditions",
                "No monitored conditions, no sensors will be created",
            );
        }
        let mut seen = HashSet::new();
        for kind in &self.monitored_conditions {
            if !seen.insert(kind) {
                result.add_warning("monitored_conditions", format!("Duplicate condition: {}", kind));
            }
        }

        if self.min_time_between_updates == 0 {
            result.add_warning(
                "min_time_between_updates",
                "Throttle disabled, every poll fetches a new report",
            );
        }

        result
    }
}

/// Registers one sensor per monitored condition, all sharing one fetcher
#[derive(Debug, Default)]
pub struct MetarPlatform;

impl MetarPlatform {
    /// Register sensors for an already decoded config block.
    ///
    /// Returns the number of sensors added.
    pub fn setup_with(config: &MetarPlatformConfig, registry: &mut EntityRegistry) -> Result<usize, AppError> {
        config.validate().into_result()?;

        let airport = config.airport();
        let data = Arc::new(MetarData::new(airport.clone(), &config.fetch_options())?);

        let mut seen = HashSet::new();
        let sensors: Vec<Box<dyn Entity>> = config
            .monitored_conditions
            .iter()
            .copied()
            .filter(|kind| seen.insert(*kind))
            .map(|kind| Box::new(MetarSensor::new(data.clone(), kind)) as Box<dyn Entity>)
            .collect();

        let added = registry.add_entities(sensors, true);
        tracing::info!(
            "Set up {} METAR sensors for {} ({}) from {}",
            added,
            airport.name,
            airport.code,
            data.station_url()
        );
        Ok(added)
    }
}

impl PlatformProvider for MetarPlatform {
    fn name(&self) -> &str {
        PLATFORM
    }

    fn setup(&self, options: &PlatformOptions, registry: &mut EntityRegistry) -> Result<(), AppError> {
        let config: MetarPlatformConfig = parse_options(PLATFORM, options)?;
        Self::setup_with(&config, registry)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metar_core::ConfigError;

    fn options(toml_src: &str) -> PlatformOptions {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config: MetarPlatformConfig =
            parse_options(PLATFORM, &options("airport_name = \"JFK\"\nairport_code = \"kjfk\"")).unwrap();

        assert!(config.monitored_conditions.is_empty());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.min_time_between_updates, 3600);
        assert_eq!(config.airport().code, "KJFK");

        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "monitored_conditions"));
    }

    #[test]
    fn test_single_condition_is_accepted() {
        let config: MetarPlatformConfig = parse_options(
            PLATFORM,
            &options("airport_name = \"JFK\"\nairport_code = \"KJFK\"\nmonitored_conditions = \"sky\""),
        )
        .unwrap();
        assert_eq!(config.monitored_conditions, vec![SensorKind::Sky]);
    }

    #[test]
    fn test_unknown_condition_is_rejected() {
        let err = parse_options::<MetarPlatformConfig>(
            PLATFORM,
            &options(
                "airport_name = \"JFK\"\nairport_code = \"KJFK\"\nmonitored_conditions = [\"temperature\", \"uv_index\"]",
            ),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_airport_code_is_rejected() {
        let err = parse_options::<MetarPlatformConfig>(PLATFORM, &options("airport_name = \"JFK\""))
            .unwrap_err();
        assert!(err.to_string().contains("airport_code"));
    }

    #[test]
    fn test_validation_errors() {
        let config = MetarPlatformConfig {
            airport_name: " ".into(),
            airport_code: "K-JFK".into(),
            monitored_conditions: vec![SensorKind::Wind, SensorKind::Wind],
            base_url: "ftp://example.com/metar/".into(),
            min_time_between_updates: 0,
        };
        let result = config.validate();

        let error_fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(error_fields, vec!["airport_name", "airport_code", "base_url"]);
        assert!(result.warnings.iter().any(|w| w.message.contains("Duplicate")));
        assert!(result.warnings.iter().any(|w| w.field == "min_time_between_updates"));
    }

    #[test]
    fn test_setup_registers_one_sensor_per_condition() {
        let mut registry = EntityRegistry::new();
        let platform = MetarPlatform;

        platform
            .setup(
                &options(
                    r#"
airport_name = "Schiphol"
airport_code = "EHAM"
monitored_conditions = ["temperature", "humidity", "temperature", "sky"]
"#,
                ),
                &mut registry,
            )
            .unwrap();

        let names: Vec<_> = registry.entities().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["Schiphol Temperature", "Schiphol Humidity", "Schiphol Sky"]
        );
    }

    #[test]
    fn test_setup_rejects_invalid_block() {
        let mut registry = EntityRegistry::new();
        let err = MetarPlatform
            .setup(
                &options("airport_name = \"X\"\nairport_code = \"TOOLONG\"\nmonitored_conditions = [\"time\"]"),
                &mut registry,
            )
            .unwrap_err();

        assert!(matches!(err, AppError::Config(ConfigError::Invalid(_))));
        assert!(registry.is_empty());
    }
}
