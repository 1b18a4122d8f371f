//! Basemaps and their composition.
//!
//! A basemap is a complete style document (inline or fetched from a URL).
//! [`BasemapComposer`] namespaces each one and keeps enough bookkeeping to
//! replace or hide it later without touching anything else in the composed
//! document.

mod catalog;
mod composer;
mod load;

pub use catalog::{BasemapConfig, BasemapId, BasemapStyle, catalog, find};
pub use composer::BasemapComposer;
pub use load::{fetch_style, load_style};

use thiserror::Error;

use crate::style::{ComposeError, StyleError};

/// Errors that can occur when resolving or composing a basemap.
#[derive(Debug, Error)]
pub enum BasemapError {
  #[error("unknown basemap '{0}'")]
  Unknown(String),

  /// The remote style could not be downloaded.
  #[error("failed to fetch style from {url}: {message}")]
  Fetch { url: String, message: String },

  /// The remote style was downloaded but is not a style document.
  #[error("style at {url} is not a valid style document")]
  Parse {
    url: String,
    #[source]
    source: StyleError,
  },

  #[error(transparent)]
  Compose(#[from] ComposeError),
}
