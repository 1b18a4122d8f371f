//! Proxy and cache configuration.
//!
//! Read from the environment:
//!
//! | Variable | Default |
//! |---|---|
//! | `MAPWEAVE_CACHE_DIR` | `<cache dir>/tiles` |
//! | `MAPWEAVE_CACHE_MAX_BYTES` | 10 GiB |
//! | `MAPWEAVE_CACHE_MAX_AGE_MS` | 1 day |
//! | `MAPWEAVE_PROXY_BASE_URL` | `https://geo.so.ch/api/wms` |
//!
//! Values that are empty or do not parse fall back to the default.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;
use tracing::warn;

use crate::cache::CacheOptions;
use crate::platform::paths::tile_cache_dir;

pub const ENV_CACHE_DIR: &str = "MAPWEAVE_CACHE_DIR";
pub const ENV_CACHE_MAX_BYTES: &str = "MAPWEAVE_CACHE_MAX_BYTES";
pub const ENV_CACHE_MAX_AGE_MS: &str = "MAPWEAVE_CACHE_MAX_AGE_MS";
pub const ENV_PROXY_BASE_URL: &str = "MAPWEAVE_PROXY_BASE_URL";

pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024 * 1024;
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_BASE_URL: &str = "https://geo.so.ch/api/wms";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  /// An explicitly supplied upstream URL is not absolute.
  #[error("invalid upstream URL '{0}'")]
  InvalidBaseUrl(String),
}

/// Settings for the tile proxy and its cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
  /// Upstream service URL; the tile query is appended after `?`.
  pub base_url: String,
  pub cache: CacheOptions,
}

impl Default for ProxyConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      cache: CacheOptions {
        directory: tile_cache_dir(),
        max_bytes: DEFAULT_MAX_BYTES,
        max_age: DEFAULT_MAX_AGE,
      },
    }
  }
}

/// A positive integer, or `None`.
fn parse_positive(name: &str, value: Option<String>) -> Option<u64> {
  let value = value?;
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return None;
  }
  match trimmed.parse::<u64>() {
    Ok(parsed) if parsed > 0 => Some(parsed),
    _ => {
      warn!(var = %name, value = %value, "ignoring invalid value, using default");
      None
    }
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

impl ProxyConfig {
  /// Reads the configuration from the process environment.
  pub fn from_env() -> Self {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Reads the configuration through `lookup`, falling back to defaults.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let defaults = Self::default();

    let directory = non_empty(lookup(ENV_CACHE_DIR))
      .map(PathBuf::from)
      .unwrap_or(defaults.cache.directory);
    let max_bytes = parse_positive(ENV_CACHE_MAX_BYTES, lookup(ENV_CACHE_MAX_BYTES)).unwrap_or(DEFAULT_MAX_BYTES);
    let max_age = parse_positive(ENV_CACHE_MAX_AGE_MS, lookup(ENV_CACHE_MAX_AGE_MS))
      .map(Duration::from_millis)
      .unwrap_or(DEFAULT_MAX_AGE);

    let base_url = match non_empty(lookup(ENV_PROXY_BASE_URL)) {
      Some(url) if Url::parse(&url).is_ok() => url,
      Some(url) => {
        warn!(var = %ENV_PROXY_BASE_URL, value = %url, "ignoring invalid URL, using default");
        defaults.base_url
      }
      None => defaults.base_url,
    };

    Self {
      base_url,
      cache: CacheOptions {
        directory,
        max_bytes,
        max_age,
      },
    }
  }

  /// Replaces the upstream URL, rejecting anything that is not an absolute URL.
  pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
    Url::parse(base_url).map_err(|_| ConfigError::InvalidBaseUrl(base_url.to_string()))?;
    self.base_url = base_url.to_string();
    Ok(self)
  }

  pub fn with_cache_dir(mut self, directory: impl Into<PathBuf>) -> Self {
    self.cache.directory = directory.into();
    self
  }
}
