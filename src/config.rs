//! Configuration management for the `Weathervane` service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::WeatherError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `Weathervane` service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeathervaneConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Forecast provider configuration
    pub weather: WeatherConfig,
    /// Durable history storage configuration
    pub storage: StorageConfig,
    /// Anonymous session configuration
    pub session: SessionConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Default application settings
    pub defaults: DefaultsConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Maximum accepted request body in KiB
    #[serde(default = "default_body_limit")]
    pub body_limit_kb: u32,
    /// User ids allowed to read the admin history listing
    #[serde(default)]
    pub admin_users: Vec<String>,
}

/// Forecast provider (OpenWeatherMap) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: Option<String>,
    /// Base URL for the forecast API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Unit system passed to the provider
    #[serde(default = "default_weather_units")]
    pub units: String,
    /// User agent sent with provider requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Durable storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database directory location
    #[serde(default = "default_storage_location")]
    pub location: String,
}

/// Anonymous session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in hours
    #[serde(default = "default_session_ttl")]
    pub ttl_hours: u32,
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Default application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Number of history entries shown and retained per identity
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

// Default value functions
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_body_limit() -> u32 {
    64
}

fn default_weather_base_url() -> String {
    "http://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_timeout() -> u32 {
    30
}

fn default_weather_units() -> String {
    "metric".to_string()
}

fn default_user_agent() -> String {
    format!("Weathervane/{}", env!("CARGO_PKG_VERSION"))
}

fn default_storage_location() -> String {
    "data/weathervane".to_string()
}

fn default_session_ttl() -> u32 {
    24 * 14
}

fn default_cookie_name() -> String {
    "weathervane_session".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_history_limit() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            body_limit_kb: default_body_limit(),
            admin_users: Vec::new(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_seconds: default_weather_timeout(),
            units: default_weather_units(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: default_storage_location(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_session_ttl(),
            cookie_name: default_cookie_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

impl Default for WeathervaneConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            weather: WeatherConfig::default(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

impl WeathervaneConfig {
    /// Load configuration from the given path, or the default locations
    ///
    /// Environment overrides use the `WEATHERVANE_` prefix with `__` between
    /// section and key, e.g. `WEATHERVANE_WEATHER__API_KEY`.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("WEATHERVANE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.admin_users")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: WeathervaneConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weathervane").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.server.body_limit_kb == 0 {
            self.server.body_limit_kb = default_body_limit();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.weather.units.is_empty() {
            self.weather.units = default_weather_units();
        }
        if self.weather.user_agent.is_empty() {
            self.weather.user_agent = default_user_agent();
        }
        if self.storage.location.is_empty() {
            self.storage.location = default_storage_location();
        }
        if self.session.ttl_hours == 0 {
            self.session.ttl_hours = default_session_ttl();
        }
        if self.session.cookie_name.is_empty() {
            self.session.cookie_name = default_cookie_name();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.defaults.history_limit == 0 {
            self.defaults.history_limit = default_history_limit();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        match &self.weather.api_key {
            None => Err(WeatherError::config(
                "OpenWeatherMap API key is required. Set weather.api_key or WEATHERVANE_WEATHER__API_KEY.",
            )
            .into()),
            Some(api_key) if api_key.trim().is_empty() => Err(WeatherError::config(
                "Weather API key cannot be empty.",
            )
            .into()),
            Some(api_key) if api_key.len() < 8 => Err(WeatherError::config(
                "Weather API key appears to be invalid (too short). Please check your API key.",
            )
            .into()),
            Some(api_key) if api_key.len() > 100 => Err(WeatherError::config(
                "Weather API key appears to be invalid (too long). Please check your API key.",
            )
            .into()),
            Some(_) => Ok(()),
        }
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(WeatherError::config("Weather API timeout cannot exceed 300 seconds").into());
        }

        if self.defaults.history_limit > 100 {
            return Err(WeatherError::config("History limit cannot exceed 100 entries").into());
        }

        if self.server.body_limit_kb > 10 * 1024 {
            return Err(WeatherError::config("Request body limit cannot exceed 10240 KiB").into());
        }

        if self.session.ttl_hours > 24 * 365 {
            return Err(WeatherError::config("Session TTL cannot exceed one year").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.weather.base_url.starts_with("http://")
            && !self.weather.base_url.starts_with("https://")
        {
            return Err(
                WeatherError::config("Weather API base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        let cookie_ok = self
            .session
            .cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !cookie_ok {
            return Err(WeatherError::config(format!(
                "Invalid session cookie name '{}'",
                self.session.cookie_name
            ))
            .into());
        }

        Ok(())
    }

    /// Address the HTTP server binds to
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
