//! The renderer collaborator.
//!
//! The engine never talks to a rendering library directly. Everything it needs
//! from the live map is expressed by [`MapSurface`]; [`MemorySurface`] is an
//! implementation backed by a plain style document.

mod memory;

pub use memory::{MemorySurface, SurfaceOp};

use serde_json::Value;
use thiserror::Error;

use crate::style::{LayerDef, SourceDef, StyleDocument};

/// Errors a renderer may report for a mutation it refuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
  #[error("source '{0}' already exists")]
  SourceExists(String),

  #[error("layer '{0}' already exists")]
  LayerExists(String),

  #[error("layer '{layer}' references missing source '{source_id}'")]
  MissingSource { layer: String, source_id: String },

  #[error("layer '{0}' does not exist")]
  LayerNotFound(String),

  /// Any other renderer-specific rejection.
  #[error("renderer rejected the change: {0}")]
  Rejected(String),
}

/// Live, mutable state of a map renderer.
///
/// Lookups return owned copies so implementations may sit in front of a
/// renderer that does not hand out references to its internal state. Removals
/// of absent ids are no-ops and report whether anything was removed.
pub trait MapSurface {
  fn layer(&self, id: &str) -> Option<LayerDef>;

  fn source(&self, id: &str) -> Option<SourceDef>;

  fn add_source(&mut self, id: &str, source: SourceDef) -> Result<(), SurfaceError>;

  /// Appends a layer on top of the current layer stack.
  fn add_layer(&mut self, layer: LayerDef) -> Result<(), SurfaceError>;

  fn remove_layer(&mut self, id: &str) -> bool;

  fn remove_source(&mut self, id: &str) -> bool;

  fn set_paint_property(&mut self, layer_id: &str, key: &str, value: Value) -> Result<(), SurfaceError>;

  fn set_layout_property(&mut self, layer_id: &str, key: &str, value: Value) -> Result<(), SurfaceError>;

  /// The renderer's current style, layers in paint order.
  fn style(&self) -> StyleDocument;

  fn has_layer(&self, id: &str) -> bool {
    self.layer(id).is_some()
  }

  fn has_source(&self, id: &str) -> bool {
    self.source(id).is_some()
  }
}
