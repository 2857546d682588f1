use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::domain::{IndexName, default_indices};
use crate::error::SyncError;

pub const DEFAULT_CONFIG_FILE: &str = "idx-sync.json";
pub const DEFAULT_BASE_URL: &str = "https://www.idx.co.id";
pub const DEFAULT_WORKING_DIR: &str = "source_data";
pub const PROXY_ENV: &str = "PROXY";
/// Upper bound for either rate-limit bound, in seconds.
pub const MAX_RATE_LIMIT_SECS: f64 = 3600.0;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub indices: Option<Vec<String>>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub catalog_retries: Option<usize>,
    #[serde(default)]
    pub accept_invalid_certs: Option<bool>,
    #[serde(default)]
    pub working_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_secs: 3.0,
            max_secs: 12.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub proxy: Option<String>,
    pub year: i32,
    pub indices: Vec<IndexName>,
    pub rate_limit: RateLimitConfig,
    pub timeout: Duration,
    pub catalog_retries: usize,
    pub accept_invalid_certs: bool,
    pub working_dir: Utf8PathBuf,
}

/// Values supplied on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub year: Option<i32>,
    pub indices: Vec<String>,
    pub proxy: Option<String>,
    pub working_dir: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `idx-sync.json` when it exists, or falls back to defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SyncError> {
        Self::resolve_config(Self::load(path)?)
    }

    pub fn load(path: Option<&str>) -> Result<Config, SyncError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SyncError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| SyncError::ConfigParse(err.to_string()))
    }

    pub fn apply_overrides(mut config: Config, overrides: ConfigOverrides) -> Config {
        if overrides.year.is_some() {
            config.year = overrides.year;
        }
        if !overrides.indices.is_empty() {
            config.indices = Some(overrides.indices);
        }
        if overrides.proxy.is_some() {
            config.proxy = overrides.proxy;
        }
        if overrides.working_dir.is_some() {
            config.working_dir = overrides.working_dir;
        }
        config
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SyncError> {
        let proxy = config
            .proxy
            .or_else(|| std::env::var(PROXY_ENV).ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|value| normalize_proxy(&value));

        let indices = match config.indices {
            Some(values) => values
                .iter()
                .map(|value| value.parse())
                .collect::<Result<Vec<IndexName>, SyncError>>()?,
            None => default_indices(),
        };

        let rate_limit = config.rate_limit.unwrap_or_default();
        if !(rate_limit.min_secs.is_finite() && rate_limit.max_secs.is_finite()) {
            return Err(SyncError::InvalidConfig(
                "rate_limit bounds must be finite".to_string(),
            ));
        }
        if rate_limit.min_secs < 0.0 || rate_limit.min_secs > rate_limit.max_secs {
            return Err(SyncError::InvalidConfig(format!(
                "rate_limit requires 0 <= min_secs <= max_secs, got {}..{}",
                rate_limit.min_secs, rate_limit.max_secs
            )));
        }
        if rate_limit.max_secs > MAX_RATE_LIMIT_SECS {
            return Err(SyncError::InvalidConfig(format!(
                "rate_limit max_secs must not exceed {MAX_RATE_LIMIT_SECS}, got {}",
                rate_limit.max_secs
            )));
        }

        let timeout_secs = config.timeout_secs.unwrap_or(60);
        if timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(SyncError::InvalidConfig("base_url is empty".to_string()));
        }

        Ok(ResolvedConfig {
            base_url,
            proxy,
            year: config.year.unwrap_or_else(current_year),
            indices,
            rate_limit,
            timeout: Duration::from_secs(timeout_secs),
            catalog_retries: config.catalog_retries.unwrap_or(3),
            accept_invalid_certs: config.accept_invalid_certs.unwrap_or(true),
            working_dir: Utf8PathBuf::from(
                config
                    .working_dir
                    .unwrap_or_else(|| DEFAULT_WORKING_DIR.to_string()),
            ),
        })
    }
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Proxy strings are often given as `user:pass@host:port`; reqwest wants a scheme.
pub fn normalize_proxy(value: &str) -> String {
    if value.contains("://") {
        value.to_string()
    } else {
        format!("http://{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config = Config {
            proxy: Some("proxy.local:8080".to_string()),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.indices, default_indices());
        assert_eq!(resolved.rate_limit, RateLimitConfig::default());
        assert_eq!(resolved.proxy.as_deref(), Some("http://proxy.local:8080"));
        assert_eq!(resolved.year, current_year());
    }

    #[test]
    fn proxy_with_scheme_is_kept() {
        assert_eq!(normalize_proxy("socks5://h:1"), "socks5://h:1");
    }
}
