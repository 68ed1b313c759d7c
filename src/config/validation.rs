//! Configuration validation logic
//!
//! Validation methods for the configuration structures, run after loading
//! and again after CLI overrides are merged.

use reqwest::Url;

use crate::config::error::ConfigError;
use crate::config::settings::{ApiConfig, FileSettings, LocationConfig, LoggerSettings, Settings};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ConfigError::validation(
            field.to_string(),
            format!("URL scheme must be http or https, got '{}'", url.scheme()),
        )),
        Err(e) => Err(ConfigError::validation(
            field.to_string(),
            format!("'{value}' is not a valid URL: {e}"),
        )),
    }
}

impl ApiConfig {
    /// Validate API configuration
    ///
    /// # Validation Rules
    /// - `base_url` and `token_url` must be absolute http(s) URLs
    /// - Cache TTL and both timeouts must be greater than 0
    /// - User agent must not be empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("api.base_url", &self.base_url)?;
        validate_url("api.token_url", &self.token_url)?;

        if self.cache_ttl_seconds == 0 {
            return Err(ConfigError::validation(
                "api.cache_ttl_seconds",
                "Cache TTL must be greater than 0 seconds.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "api.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        if self.connect_timeout == 0 {
            return Err(ConfigError::validation(
                "api.connect_timeout",
                "Connect timeout must be greater than 0 seconds.",
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::validation(
                "api.user_agent",
                "User agent cannot be empty.",
            ));
        }

        Ok(())
    }
}

impl LocationConfig {
    /// Latitude in [-90, 90], longitude in [-180, 180].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ConfigError::validation(
                "location.latitude".to_string(),
                format!("Latitude {} is outside [-90, 90].", self.latitude),
            ));
        }

        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ConfigError::validation(
                "location.longitude".to_string(),
                format!("Longitude {} is outside [-180, 180].", self.longitude),
            ));
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path cannot be empty when file logging is enabled.",
            ));
        }
        self.parse_format().map(|_| ())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Level must be a known level name or a filter directive list
    /// - File path must not be empty when file output is enabled
    /// - Format must be one of full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.to_lowercase();
        if !level.contains('=') && !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::validation(
                "logger.level".to_string(),
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl Settings {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.location.validate()?;
        self.logger.validate()?;
        Ok(())
    }
}
