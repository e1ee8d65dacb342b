//! Sensor host runtime.
//!
//! Loads the configuration, hands each `[[sensor]]` block to its platform,
//! and polls the resulting entities on a fixed interval.

pub mod app;
pub mod config;
pub mod entity;
pub mod error;
pub mod platform;

pub use app::App;
pub use config::{Config, PlatformConfig, PlatformOptions, PollingConfig, ValidationResult};
pub use entity::{Entity, EntityRegistry, EntityState, SensorValue};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt};
pub use platform::PlatformProvider;

use anyhow::Result;

/// Initialize logging for the host
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Sensor host initialized");
    Ok(())
}
