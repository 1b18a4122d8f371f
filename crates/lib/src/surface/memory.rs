use serde::Serialize;
use serde_json::Value;

use crate::ready::{EventCapability, StyleLifecycle};
use crate::style::{LayerDef, PropertyMap, SourceDef, StyleDocument};

use super::{MapSurface, SurfaceError};

/// A mutation applied to a [`MemorySurface`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SurfaceOp {
  AddSource { id: String, url: Option<String> },
  AddLayer { id: String },
  RemoveLayer { id: String },
  RemoveSource { id: String },
  SetPaint { layer: String, key: String, value: Value },
  SetLayout { layer: String, key: String, value: Value },
}

impl SurfaceOp {
  /// The layer or source id this operation touched.
  pub fn target(&self) -> &str {
    match self {
      SurfaceOp::AddSource { id, .. }
      | SurfaceOp::AddLayer { id }
      | SurfaceOp::RemoveLayer { id }
      | SurfaceOp::RemoveSource { id } => id,
      SurfaceOp::SetPaint { layer, .. } | SurfaceOp::SetLayout { layer, .. } => layer,
    }
  }

  /// Adds and removes change the layer stack; property writes do not.
  pub fn is_structural(&self) -> bool {
    !matches!(self, SurfaceOp::SetPaint { .. } | SurfaceOp::SetLayout { .. })
  }
}

/// In-memory renderer over a [`StyleDocument`].
///
/// Applies the same checks a real renderer does (unique ids, layers must name
/// an existing source) and records every successful mutation.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
  style: StyleDocument,
  ops: Vec<SurfaceOp>,
}

impl MemorySurface {
  pub fn new(style: StyleDocument) -> Self {
    Self {
      style,
      ops: Vec::new(),
    }
  }

  /// Mutations applied so far, oldest first.
  pub fn ops(&self) -> &[SurfaceOp] {
    &self.ops
  }

  /// Returns and clears the recorded mutations.
  pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
    std::mem::take(&mut self.ops)
  }

  pub fn into_style(self) -> StyleDocument {
    self.style
  }

  fn layer_mut(&mut self, id: &str) -> Result<&mut LayerDef, SurfaceError> {
    self
      .style
      .layer_mut(id)
      .ok_or_else(|| SurfaceError::LayerNotFound(id.to_string()))
  }
}

impl MapSurface for MemorySurface {
  fn layer(&self, id: &str) -> Option<LayerDef> {
    self.style.layer(id).cloned()
  }

  fn source(&self, id: &str) -> Option<SourceDef> {
    self.style.sources.get(id).cloned()
  }

  fn add_source(&mut self, id: &str, source: SourceDef) -> Result<(), SurfaceError> {
    if self.style.sources.contains_key(id) {
      return Err(SurfaceError::SourceExists(id.to_string()));
    }
    self.ops.push(SurfaceOp::AddSource {
      id: id.to_string(),
      url: source.url.clone(),
    });
    self.style.sources.insert(id, source);
    Ok(())
  }

  fn add_layer(&mut self, layer: LayerDef) -> Result<(), SurfaceError> {
    if self.style.layer(&layer.id).is_some() {
      return Err(SurfaceError::LayerExists(layer.id));
    }
    if let Some(source) = &layer.source {
      if !self.style.sources.contains_key(source) {
        return Err(SurfaceError::MissingSource {
          layer: layer.id.clone(),
          source_id: source.clone(),
        });
      }
    }
    self.ops.push(SurfaceOp::AddLayer { id: layer.id.clone() });
    self.style.layers.push(layer);
    Ok(())
  }

  fn remove_layer(&mut self, id: &str) -> bool {
    let before = self.style.layers.len();
    self.style.layers.retain(|l| l.id != id);
    let removed = self.style.layers.len() != before;
    if removed {
      self.ops.push(SurfaceOp::RemoveLayer { id: id.to_string() });
    }
    removed
  }

  fn remove_source(&mut self, id: &str) -> bool {
    let removed = self.style.sources.remove(id).is_some();
    if removed {
      self.ops.push(SurfaceOp::RemoveSource { id: id.to_string() });
    }
    removed
  }

  fn set_paint_property(&mut self, layer_id: &str, key: &str, value: Value) -> Result<(), SurfaceError> {
    let layer = self.layer_mut(layer_id)?;
    layer
      .paint
      .get_or_insert_with(PropertyMap::new)
      .insert(key.to_string(), value.clone());
    self.ops.push(SurfaceOp::SetPaint {
      layer: layer_id.to_string(),
      key: key.to_string(),
      value,
    });
    Ok(())
  }

  fn set_layout_property(&mut self, layer_id: &str, key: &str, value: Value) -> Result<(), SurfaceError> {
    let layer = self.layer_mut(layer_id)?;
    layer
      .layout
      .get_or_insert_with(PropertyMap::new)
      .insert(key.to_string(), value.clone());
    self.ops.push(SurfaceOp::SetLayout {
      layer: layer_id.to_string(),
      key: key.to_string(),
      value,
    });
    Ok(())
  }

  fn style(&self) -> StyleDocument {
    self.style.clone()
  }
}

/// An in-memory style is always loaded and never emits lifecycle events.
impl StyleLifecycle for MemorySurface {
  fn is_style_loaded(&self) -> bool {
    true
  }

  fn event_capability(&self) -> EventCapability {
    EventCapability::Unavailable
  }
}
