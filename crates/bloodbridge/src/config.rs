//! Configuration management for bloodbridge.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then `BLOODBRIDGE_` environment variables.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::locator::{Coordinates, LocatorOptions, DEFAULT_USER_AGENT};
use crate::store::DEFAULT_MATCH_RADIUS_KM;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the platform config and data directories.
const DATA_DIR_NAME: &str = "bloodbridge";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "bloodbridge.db";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "BLOODBRIDGE_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `BLOODBRIDGE_`, sections split by `__`)
/// 2. TOML config file at `~/.config/bloodbridge/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record storage configuration.
    pub storage: StorageConfig,
    /// Hospital locator configuration.
    pub locator: LocatorConfig,
    /// Donor matching configuration.
    pub matching: MatchingConfig,
}

/// Which key-value backend holds the records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite database file.
    #[default]
    Sqlite,
    /// Process memory; nothing survives exit.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => f.write_str("sqlite"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/bloodbridge/bloodbridge.db`
    pub database_path: Option<PathBuf>,
    /// Backend kind.
    pub backend: BackendKind,
}

/// Hospital locator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Overpass interpreter endpoint.
    pub overpass_url: String,
    /// Nominatim reverse-geocoding endpoint.
    pub nominatim_url: String,
    /// `User-Agent` header sent to both services.
    pub user_agent: String,
    /// Search radius in metres.
    pub radius_m: u32,
    /// Maximum number of hospitals listed.
    pub max_results: usize,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Budget for all address lookups together, in milliseconds.
    pub enrichment_deadline_ms: u64,
    /// Retries after a transient address lookup failure.
    pub max_retries: u32,
    /// Position used when none is given on the command line.
    pub default_location: Option<Coordinates>,
}

/// Donor matching configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Search radius around an emergency request in kilometres.
    pub radius_km: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        let options = LocatorOptions::default();
        Self {
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            nominatim_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            radius_m: options.radius_m,
            max_results: options.max_results,
            request_timeout_ms: 10_000,
            enrichment_deadline_ms: 30_000,
            max_retries: options.max_retries,
            default_location: None,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_MATCH_RADIUS_KM,
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| invalid(format!("{field} is not a valid URL ({value}): {e}")))
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let locator = &self.locator;

        if locator.radius_m == 0 {
            return Err(invalid("radius_m must be greater than 0"));
        }
        if locator.max_results == 0 {
            return Err(invalid("max_results must be greater than 0"));
        }
        if locator.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms must be greater than 0"));
        }
        if locator.enrichment_deadline_ms == 0 {
            return Err(invalid("enrichment_deadline_ms must be greater than 0"));
        }
        if locator.user_agent.trim().is_empty() {
            return Err(invalid("user_agent must not be empty"));
        }
        self.overpass_endpoint()?;
        self.nominatim_endpoint()?;

        if let Some(location) = &locator.default_location {
            location
                .validate()
                .map_err(|e| invalid(format!("default_location: {e}")))?;
        }

        let radius_km = self.matching.radius_km;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(invalid(format!(
                "radius_km must be a positive number, got {radius_km}"
            )));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Parsed Overpass endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the URL does not parse.
    pub fn overpass_endpoint(&self) -> Result<Url> {
        parse_url("overpass_url", &self.locator.overpass_url)
    }

    /// Parsed Nominatim endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the URL does not parse.
    pub fn nominatim_endpoint(&self) -> Result<Url> {
        parse_url("nominatim_url", &self.locator.nominatim_url)
    }

    /// Per-request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.locator.request_timeout_ms)
    }

    /// Locator tuning derived from the `[locator]` section.
    #[must_use]
    pub fn locator_options(&self) -> LocatorOptions {
        LocatorOptions {
            radius_m: self.locator.radius_m,
            max_results: self.locator.max_results,
            request_timeout: self.request_timeout(),
            enrichment_deadline: Duration::from_millis(self.locator.enrichment_deadline_ms),
            max_retries: self.locator.max_retries,
            ..LocatorOptions::default()
        }
    }
}
