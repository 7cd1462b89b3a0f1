//! Configuration settings for Opticon.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix, e.g. `OPTICON__API__BASE_URL`.
const ENV_PREFIX: &str = "OPTICON";

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API configuration.
    pub api: ApiConfig,
    /// Logging configuration.
    pub logging: LogConfig,
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    pub fn load_or_default() -> crate::Result<Self> {
        Self::load(None)
    }

    /// Load configuration.
    ///
    /// Sources are layered: built-in defaults, then the TOML file (if it
    /// exists), then `OPTICON__*` environment variables.
    pub fn load(path: Option<PathBuf>) -> crate::Result<Self> {
        let config_path = path.unwrap_or_else(default_config_path);
        Self::load_with_env(&config_path, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: &Path, env: config::Environment) -> crate::Result<Self> {
        let defaults = config::Config::try_from(&Self::default())?;

        let loaded: Self = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path).required(false))
            .add_source(env.prefix_separator("__").separator("__"))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Save configuration to file.
    pub fn save(&self, path: Option<PathBuf>) -> crate::Result<()> {
        let config_path = path.unwrap_or_else(default_config_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Check values that serde cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        let url = url::Url::parse(&self.api.base_url)
            .map_err(|e| crate::Error::config(format!("invalid api.base_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(crate::Error::config(format!(
                "api.base_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.api.request_timeout_secs == 0 || self.api.resource_timeout_secs == 0 {
            return Err(crate::Error::config("api timeouts must be non-zero"));
        }
        Ok(())
    }
}

fn default_config_path() -> PathBuf {
    super::config_dir()
        .map(|p| p.join("config.toml"))
        .unwrap_or_else(|_| PathBuf::from("config.toml"))
}

/// API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Origin every API path is resolved against.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Upper bound for a whole exchange (send + body) in seconds.
    pub resource_timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Default page size for prediction markets.
    pub markets_limit: u32,
    /// Default ordering key for prediction markets.
    pub markets_order: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://opticon.heyitsmejosh.com".to_string(),
            request_timeout_secs: 15,
            resource_timeout_secs: 30,
            user_agent: format!("opticon/{}", env!("CARGO_PKG_VERSION")),
            markets_limit: 50,
            markets_order: "volume24hr".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resource_timeout(&self) -> Duration {
        Duration::from_secs(self.resource_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Also write a daily-rotated log file under the data directory.
    pub file_logging: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
        }
    }
}
