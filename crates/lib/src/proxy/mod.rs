//! Cache-first proxy in front of a remote raster tile service.
//!
//! The tile query string is appended to the configured upstream URL and the
//! full upstream URL is the cache key. Only PNG responses are cached.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::TileCache;
use crate::config::ProxyConfig;

/// Cache policy sent with every proxied response.
pub const CACHE_CONTROL: &str = "public, max-age=0, must-revalidate";

const CACHEABLE_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum ProxyError {
  #[error("missing tile query parameters")]
  MissingQuery,

  /// The upstream service could not be reached or the body not read.
  #[error("upstream request to {url} failed: {message}")]
  Transport { url: String, message: String },

  #[error("upstream request failed with status {status}")]
  Upstream { status: u16 },
}

impl ProxyError {
  /// HTTP status a server front end should answer with.
  pub fn status_code(&self) -> u16 {
    match self {
      ProxyError::MissingQuery => 400,
      ProxyError::Transport { .. } => 502,
      ProxyError::Upstream { status } => *status,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
  /// Served from the cache.
  Hit,
  /// Fetched upstream and stored.
  Miss,
  /// Fetched upstream, not cacheable.
  Bypass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub cache_control: &'static str,
  pub cache_status: CacheStatus,
  pub body: Vec<u8>,
}

fn is_cacheable(content_type: Option<&str>) -> bool {
  content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains(CACHEABLE_CONTENT_TYPE))
}

pub struct TileProxy {
  client: reqwest::Client,
  base_url: String,
  cache: TileCache,
}

impl TileProxy {
  pub fn new(config: ProxyConfig) -> Self {
    Self::with_client(config, reqwest::Client::new())
  }

  pub fn with_client(config: ProxyConfig, client: reqwest::Client) -> Self {
    Self {
      client,
      base_url: config.base_url,
      cache: TileCache::new(config.cache),
    }
  }

  pub fn cache(&self) -> &TileCache {
    &self.cache
  }

  /// The upstream URL for a tile query. A leading `?` on the query is ignored.
  pub fn upstream_url(&self, query: &str) -> String {
    format!("{}?{}", self.base_url, query.trim_start_matches('?'))
  }

  /// Returns the tile for `query`, from the cache when possible.
  pub async fn fetch(&self, query: &str) -> Result<ProxyResponse, ProxyError> {
    if query.trim_start_matches('?').trim().is_empty() {
      return Err(ProxyError::MissingQuery);
    }

    let url = self.upstream_url(query);

    if let Some(hit) = self.cache.get(&url).await {
      debug!(url = %url, size = hit.bytes.len(), "serving tile from cache");
      return Ok(ProxyResponse {
        status: 200,
        content_type: Some(hit.content_type),
        cache_control: CACHE_CONTROL,
        cache_status: CacheStatus::Hit,
        body: hit.bytes,
      });
    }

    info!(url = %url, "fetching tile upstream");
    let response = self.client.get(&url).send().await.map_err(|e| ProxyError::Transport {
      url: url.clone(),
      message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
      return Err(ProxyError::Upstream {
        status: status.as_u16(),
      });
    }

    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|value| value.to_str().ok())
      .map(str::to_string);

    let body = response.bytes().await.map_err(|e| ProxyError::Transport {
      url: url.clone(),
      message: e.to_string(),
    })?;

    let cache_status = if is_cacheable(content_type.as_deref()) {
      let stored_type = content_type.as_deref().unwrap_or(CACHEABLE_CONTENT_TYPE);
      self.cache.set(&url, &body, stored_type).await;
      CacheStatus::Miss
    } else {
      debug!(url = %url, content_type = ?content_type, "response not cacheable");
      CacheStatus::Bypass
    };

    Ok(ProxyResponse {
      status: status.as_u16(),
      content_type,
      cache_control: CACHE_CONTROL,
      cache_status,
      body: body.to_vec(),
    })
  }
}
