//! Configuration management for the weather assistant
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::AssistantError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable consulted when no API key is configured
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Root configuration structure for the weather assistant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Inbound HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Language model settings
    #[serde(default)]
    pub model: ModelConfig,
    /// Geocoding and forecast lookups
    #[serde(default)]
    pub lookup: LookupConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Inbound HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for handling one request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    /// PEM certificate, only honored with the `tls` feature
    pub tls_cert_path: Option<PathBuf>,
    /// PEM private key, only honored with the `tls` feature
    pub tls_key_path: Option<PathBuf>,
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// API key; falls back to `OPENAI_API_KEY`
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL for an OpenAI-compatible API
    #[serde(default = "default_model_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

/// Geocoding and forecast lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,
    /// Deadline for each lookup, in seconds
    #[serde(default = "default_lookup_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
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
    /// OTLP/HTTP collector endpoint; spans are exported only when set
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u32 {
    60
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_model_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model_timeout() -> u32 {
    30
}

fn default_temperature() -> f64 {
    0.2
}

fn default_system_prompt() -> String {
    "You are a concise travel assistant. Keep answers short and friendly. Use the available tools when the question needs the current time or weather.".to_string()
}

fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_forecast_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_lookup_timeout() -> u32 {
    10
}

fn default_user_agent() -> String {
    crate::lookup::DEFAULT_USER_AGENT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_model_base_url(),
            timeout_seconds: default_model_timeout(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            geocoding_base_url: default_geocoding_base_url(),
            forecast_base_url: default_forecast_base_url(),
            timeout_seconds: default_lookup_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl LookupConfig {
    /// Per-call deadline for geocoding and forecast requests
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl ModelConfig {
    /// Configured API key, or the `OPENAI_API_KEY` environment variable
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        std::env::var(OPENAI_API_KEY_ENV).map_err(|_| {
            AssistantError::config(format!(
                "No model API key configured. Set model.api_key or {OPENAI_API_KEY_ENV}."
            ))
            .into()
        })
    }
}

impl AssistantConfig {
    /// Load configuration from `config_path`, or the default location when
    /// none is given, then apply environment overrides
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment variable overrides, e.g. ASSISTANT_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("ASSISTANT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AssistantConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weather-assistant").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.model.model.is_empty() {
            self.model.model = default_model();
        }
        if self.model.base_url.is_empty() {
            self.model.base_url = default_model_base_url();
        }
        if self.model.timeout_seconds == 0 {
            self.model.timeout_seconds = default_model_timeout();
        }
        if self.model.system_prompt.is_empty() {
            self.model.system_prompt = default_system_prompt();
        }
        if self.lookup.geocoding_base_url.is_empty() {
            self.lookup.geocoding_base_url = default_geocoding_base_url();
        }
        if self.lookup.forecast_base_url.is_empty() {
            self.lookup.forecast_base_url = default_forecast_base_url();
        }
        if self.lookup.timeout_seconds == 0 {
            self.lookup.timeout_seconds = default_lookup_timeout();
        }
        if self.lookup.user_agent.is_empty() {
            self.lookup.user_agent = default_user_agent();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.request_timeout_seconds > 300 {
            return Err(AssistantError::config(
                "Server request timeout cannot exceed 300 seconds",
            )
            .into());
        }

        if self.model.timeout_seconds > 300 {
            return Err(AssistantError::config("Model API timeout cannot exceed 300 seconds").into());
        }

        if self.lookup.timeout_seconds > 300 {
            return Err(AssistantError::config("Lookup timeout cannot exceed 300 seconds").into());
        }

        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(AssistantError::config(format!(
                "Model temperature must be between 0 and 2, got: {}",
                self.model.temperature
            ))
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AssistantError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AssistantError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Model API base URL", &self.model.base_url),
            ("Geocoding base URL", &self.lookup.geocoding_base_url),
            ("Forecast base URL", &self.lookup.forecast_base_url),
        ];
        for (label, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AssistantError::config(format!(
                    "{label} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
