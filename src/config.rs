//! Configuration management for the `AgroPlan` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::AgroPlanError;
use crate::geocoding::BiomeTable;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable consulted when `model.api_key` is not configured
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// Root configuration structure for the `AgroPlan` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgroPlanConfig {
    /// Outbound HTTP settings shared by the geocoding fetcher
    pub http: HttpConfig,
    /// Geocoding provider configuration
    pub geocoding: GeocodingConfig,
    /// Generative model configuration
    pub model: ModelConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Replacement biome/soil rule table (built-in table when absent)
    pub biome: Option<BiomeTable>,
}

/// HTTP fetcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_seconds: u32,
    /// Attempts per request before giving up on network faults or HTTP 429
    pub max_attempts: u32,
    /// User-Agent header (Nominatim rejects anonymous clients)
    pub user_agent: String,
}

/// Supported geocoding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodingProvider {
    /// Open-Meteo geocoding API; region and country come with the search result
    #[default]
    OpenMeteo,
    /// OpenStreetMap Nominatim; supports reverse lookups for address details
    Nominatim,
}

impl std::fmt::Display for GeocodingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenMeteo => write!(f, "Open-Meteo"),
            Self::Nominatim => write!(f, "Nominatim (OpenStreetMap)"),
        }
    }
}

/// Geocoding configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    /// Which backend to query
    pub provider: GeocodingProvider,
    /// Search endpoint; empty selects the provider default
    pub search_url: String,
    /// Reverse lookup endpoint; empty selects the provider default
    pub reverse_url: String,
    /// Preferred result language
    pub language: String,
    /// Run a reverse lookup for address details (Nominatim only)
    pub reverse_lookup: bool,
    /// Lifetime of cached resolutions in hours
    pub cache_ttl_hours: u32,
}

/// Generative model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API key; falls back to the `GEMINI_API_KEY` environment variable
    pub api_key: Option<String>,
    /// Model identifier
    pub name: String,
    /// Base URL of the Generative Language API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_http_timeout() -> u32 {
    15
}

fn default_http_max_attempts() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("AgroPlan/{} (agroforestry-planner)", env!("CARGO_PKG_VERSION"))
}

fn default_language() -> String {
    "en".to_string()
}

fn default_cache_ttl() -> u32 {
    24
}

fn default_model_name() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_model_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model_timeout() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
            max_attempts: default_http_max_attempts(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        let provider = GeocodingProvider::default();
        Self {
            provider,
            search_url: provider.default_search_url().to_string(),
            reverse_url: provider.default_reverse_url().to_string(),
            language: default_language(),
            reverse_lookup: false,
            cache_ttl_hours: default_cache_ttl(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            name: default_model_name(),
            base_url: default_model_base_url(),
            timeout_seconds: default_model_timeout(),
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

impl GeocodingProvider {
    #[must_use]
    pub fn default_search_url(self) -> &'static str {
        match self {
            Self::OpenMeteo => "https://geocoding-api.open-meteo.com/v1/search",
            Self::Nominatim => "https://nominatim.openstreetmap.org/search",
        }
    }

    /// Open-Meteo has no reverse endpoint; the empty string disables lookups.
    #[must_use]
    pub fn default_reverse_url(self) -> &'static str {
        match self {
            Self::OpenMeteo => "",
            Self::Nominatim => "https://nominatim.openstreetmap.org/reverse",
        }
    }
}

impl ModelConfig {
    /// Resolve the API key from config or environment, failing fast when absent.
    pub fn resolve_api_key(&self) -> std::result::Result<String, AgroPlanError> {
        self.api_key_or(env::var(API_KEY_ENV_VAR).ok())
    }

    fn api_key_or(&self, from_env: Option<String>) -> std::result::Result<String, AgroPlanError> {
        let from_config = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        if let Some(key) = from_config {
            return Ok(key.to_string());
        }
        match from_env {
            Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(AgroPlanError::config(format!(
                "model API key is missing; set model.api_key or the {API_KEY_ENV_VAR} environment variable"
            ))),
        }
    }
}

impl AgroPlanConfig {
    /// Load configuration from the given file (or the default path) and environment variables
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

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

        // AGROPLAN_MODEL__API_KEY, AGROPLAN_GEOCODING__PROVIDER, ...
        builder = builder.add_source(
            Environment::with_prefix("AGROPLAN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AgroPlanConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("agroplan").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.http.timeout_seconds == 0 {
            self.http.timeout_seconds = default_http_timeout();
        }
        if self.http.max_attempts == 0 {
            self.http.max_attempts = default_http_max_attempts();
        }
        if self.http.user_agent.is_empty() {
            self.http.user_agent = default_user_agent();
        }
        // A provider switch without explicit URLs must not keep the other provider's endpoints.
        let provider = self.geocoding.provider;
        let known_search = [
            GeocodingProvider::OpenMeteo.default_search_url(),
            GeocodingProvider::Nominatim.default_search_url(),
        ];
        if self.geocoding.search_url.is_empty() || known_search.contains(&self.geocoding.search_url.as_str()) {
            self.geocoding.search_url = provider.default_search_url().to_string();
        }
        let known_reverse = GeocodingProvider::Nominatim.default_reverse_url();
        if self.geocoding.reverse_url.is_empty() || self.geocoding.reverse_url == known_reverse {
            self.geocoding.reverse_url = provider.default_reverse_url().to_string();
        }
        if self.geocoding.language.is_empty() {
            self.geocoding.language = default_language();
        }
        if self.geocoding.cache_ttl_hours == 0 {
            self.geocoding.cache_ttl_hours = default_cache_ttl();
        }
        if self.model.name.is_empty() {
            self.model.name = default_model_name();
        }
        if self.model.base_url.is_empty() {
            self.model.base_url = default_model_base_url();
        }
        if self.model.timeout_seconds == 0 {
            self.model.timeout_seconds = default_model_timeout();
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
        if let Some(table) = &self.biome {
            table.validate()?;
        }
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.http.timeout_seconds > 300 {
            return Err(AgroPlanError::config("HTTP timeout cannot exceed 300 seconds").into());
        }

        if self.http.max_attempts > 3 {
            return Err(AgroPlanError::config("HTTP max attempts cannot exceed 3").into());
        }

        if self.geocoding.cache_ttl_hours > 720 {
            return Err(AgroPlanError::config(
                "Geocoding cache TTL cannot exceed 720 hours (30 days)",
            )
            .into());
        }

        if self.model.timeout_seconds > 600 {
            return Err(AgroPlanError::config("Model timeout cannot exceed 600 seconds").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AgroPlanError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AgroPlanError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Geocoding search URL", self.geocoding.search_url.as_str()),
            ("Model base URL", self.model.base_url.as_str()),
        ];
        for (label, url) in urls {
            if !is_http_url(url) {
                return Err(AgroPlanError::config(format!(
                    "{label} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if !self.geocoding.reverse_url.is_empty() && !is_http_url(&self.geocoding.reverse_url) {
            return Err(AgroPlanError::config(
                "Geocoding reverse URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AgroPlanConfig::default();
        assert_eq!(config.http.timeout_seconds, 15);
        assert_eq!(config.http.max_attempts, 3);
        assert_eq!(config.geocoding.provider, GeocodingProvider::OpenMeteo);
        assert_eq!(
            config.geocoding.search_url,
            "https://geocoding-api.open-meteo.com/v1/search"
        );
        assert_eq!(config.geocoding.cache_ttl_hours, 24);
        assert_eq!(config.model.name, "gemini-2.0-flash");
        assert_eq!(config.logging.level, "info");
        assert!(config.biome.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = AgroPlanConfig::default();
        config.logging.level = "loud".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = AgroPlanConfig::default();
        config.http.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_rejects_non_http_urls() {
        let mut config = AgroPlanConfig::default();
        config.model.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_switch_picks_matching_endpoints() {
        let mut config = AgroPlanConfig::default();
        config.geocoding.provider = GeocodingProvider::Nominatim;
        config.apply_defaults();
        assert_eq!(
            config.geocoding.search_url,
            "https://nominatim.openstreetmap.org/search"
        );
        assert_eq!(
            config.geocoding.reverse_url,
            "https://nominatim.openstreetmap.org/reverse"
        );
    }

    #[test]
    fn test_custom_urls_survive_defaults() {
        let mut config = AgroPlanConfig::default();
        config.geocoding.search_url = "http://localhost:9000/search".to_string();
        config.apply_defaults();
        assert_eq!(config.geocoding.search_url, "http://localhost:9000/search");
    }

    #[test]
    fn test_api_key_from_config_is_trimmed() {
        let mut model = ModelConfig::default();
        model.api_key = Some("  secret-key  ".to_string());
        assert_eq!(model.resolve_api_key().unwrap(), "secret-key");
    }

    #[test]
    fn test_api_key_falls_back_to_environment() {
        let model = ModelConfig::default();
        assert_eq!(model.api_key_or(Some(" env-key ".to_string())).unwrap(), "env-key");
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let model = ModelConfig {
            api_key: Some("   ".to_string()),
            ..ModelConfig::default()
        };
        for from_env in [None, Some(String::new())] {
            let err = model.api_key_or(from_env).unwrap_err();
            assert!(matches!(err, AgroPlanError::Config { .. }));
            assert!(err.to_string().contains(API_KEY_ENV_VAR));
        }
    }

    #[test]
    fn test_max_attempts_capped_at_three() {
        let mut config = AgroPlanConfig::default();
        config.http.max_attempts = 3;
        assert!(config.validate().is_ok());

        config.http.max_attempts = 4;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("max attempts cannot exceed 3"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[geocoding]
provider = "nominatim"
reverse_lookup = true
cache_ttl_hours = 12

[model]
api_key = "from-file-key"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = AgroPlanConfig::load_from_path(Some(path)).unwrap();
        assert_eq!(config.geocoding.provider, GeocodingProvider::Nominatim);
        assert!(config.geocoding.reverse_lookup);
        assert_eq!(config.geocoding.cache_ttl_hours, 12);
        assert_eq!(
            config.geocoding.search_url,
            "https://nominatim.openstreetmap.org/search"
        );
        assert_eq!(config.model.resolve_api_key().unwrap(), "from-file-key");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.http.max_attempts, 3);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = AgroPlanConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("agroplan"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
