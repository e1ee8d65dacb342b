//! Centralized error types for the sensor host.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the codebase
//! - Provides short operator-facing messages for logs
//! - Preserves full error context for debugging

use thiserror::Error;

/// Top-level host error type.
///
/// Platform crates convert their own errors into this type at the
/// `PlatformProvider::setup` boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform {platform} failed: {message}")]
    Platform { platform: String, message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Create a platform error from any displayable cause.
    pub fn platform(platform: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Platform {
            platform: platform.into(),
            message: message.to_string(),
        }
    }

    /// Returns a short message suitable for operator-facing logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Platform { .. } => "A sensor platform could not be set up.",
            AppError::Other(_) => "An unexpected error occurred.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "Unable to connect. Check the network.",
            NetworkError::Timeout => "The request timed out.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The report server is experiencing issues."
            }
            NetworkError::ServerError { .. } => "The report request was rejected.",
            NetworkError::InvalidResponse(_) => "Received an unexpected response.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
            ConfigError::UnknownPlatform(_) => "A sensor block names a platform that is not installed.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() || self.is_body() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let config_err = ConfigError::MissingSetting("airport_code".into());
        let app_err: AppError = config_err.into();
        assert!(matches!(
            app_err,
            AppError::Config(ConfigError::MissingSetting(_))
        ));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Network(NetworkError::Timeout);
        assert_eq!(app_err.user_message(), "The request timed out.");
    }

    #[test]
    fn test_server_error_message_depends_on_status() {
        let upstream = NetworkError::ServerError {
            status: 503,
            message: "unavailable".into(),
        };
        let rejected = NetworkError::ServerError {
            status: 404,
            message: "missing".into(),
        };
        assert_ne!(upstream.user_message(), rejected.user_message());
    }

    #[test]
    fn test_platform_error_display() {
        let err = AppError::platform("metar", "airport_code: must not be empty");
        assert_eq!(
            err.to_string(),
            "Platform metar failed: airport_code: must not be empty"
        );
    }
}
