//! Loading basemap style documents.

use tracing::{debug, info};

use crate::style::{StyleDocument, normalise_style};

use super::{BasemapConfig, BasemapError, BasemapStyle};

/// Returns the style document for `basemap`, fetching it if it is remote.
///
/// Inline documents are returned as they are; their relative references are
/// resolved by the caller against wherever the composed style is served from.
pub async fn load_style(basemap: &BasemapConfig) -> Result<StyleDocument, BasemapError> {
  match &basemap.style {
    BasemapStyle::Inline(style) => Ok(style.clone()),
    BasemapStyle::Remote(url) => fetch_style(url).await,
  }
}

/// Downloads a style document and anchors its relative references at `url`.
pub async fn fetch_style(url: &str) -> Result<StyleDocument, BasemapError> {
  info!(url = %url, "fetching style document");

  let response = reqwest::get(url).await.map_err(|e| BasemapError::Fetch {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  if !response.status().is_success() {
    return Err(BasemapError::Fetch {
      url: url.to_string(),
      message: format!("HTTP {}", response.status()),
    });
  }

  let body = response.text().await.map_err(|e| BasemapError::Fetch {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  let style = StyleDocument::from_json(&body).map_err(|source| BasemapError::Parse {
    url: url.to_string(),
    source,
  })?;

  debug!(url = %url, sources = style.sources.len(), layers = style.layers.len(), "style document loaded");

  Ok(normalise_style(&style, Some(url)))
}
