use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Options table of one `[[sensor]]` block, minus the `platform` key.
pub type PlatformOptions = toml::Table;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Log warnings and turn errors into a `ConfigError::Invalid`.
    pub fn into_result(self) -> Result<Vec<ConfigValidationError>, ConfigError> {
        if !self.is_valid() {
            return Err(ConfigError::Invalid(self.error_summary()));
        }
        for warning in &self.warnings {
            tracing::warn!("Config warning: {}", warning);
        }
        Ok(self.warnings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Host polling settings
    #[serde(default)]
    pub polling: PollingConfig,

    /// Sensor platform blocks, one per `[[sensor]]` table
    #[serde(default, rename = "sensor", skip_serializing_if = "Vec::is_empty")]
    pub sensors: Vec<PlatformConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between entity polls
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
}

fn default_scan_interval_secs() -> u64 {
    3600
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
        }
    }
}

impl PollingConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

/// One `[[sensor]]` block: the platform name plus its own options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub platform: String,

    #[serde(flatten)]
    pub options: PlatformOptions,
}

impl PlatformConfig {
    /// Decode this block's options into a platform-specific schema.
    pub fn parse_options<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        parse_options(&self.platform, &self.options)
    }
}

/// Decode an options table into a platform-specific schema.
///
/// Unknown enum values and missing required keys surface as
/// `ConfigError::ParseError` naming the platform.
pub fn parse_options<T: DeserializeOwned>(
    platform: &str,
    options: &PlatformOptions,
) -> Result<T, ConfigError> {
    toml::Value::Table(options.clone())
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError(format!("{}: {}", platform, e.message())))
}

impl Config {
    /// Load configuration from the default file, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the host-level configuration
    ///
    /// Platform options are validated by each platform during setup.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.polling.scan_interval_secs == 0 {
            result.add_error(
                "polling.scan_interval_secs",
                "Scan interval must be greater than 0",
            );
        } else if self.polling.scan_interval_secs > 86_400 {
            result.add_warning(
                "polling.scan_interval_secs",
                "Scan interval is more than 24 hours",
            );
        }

        if self.sensors.is_empty() {
            result.add_warning("sensor", "No sensor platforms configured");
        }

        for (idx, sensor) in self.sensors.iter().enumerate() {
            if sensor.platform.trim().is_empty() {
                result.add_error(format!("sensor[{}].platform", idx), "Platform name is empty");
            }
        }

        result
    }

    /// Save configuration to a file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the default configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("metar");

        Ok(config_dir.join("config.toml"))
    }
}
