//! Tile archive metadata.
//!
//! A vector archive lists its fetchable sub-layers in `vector_layers`. Until
//! that list is known a vector overlay cannot be drawn, see
//! [`OverlayLayer::resolve_source_layer`](super::OverlayLayer::resolve_source_layer).

use serde::{Deserialize, Serialize};

/// One entry of an archive's `vector_layers` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorLayerInfo {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
}

/// The subset of archive metadata used to pick a sub-layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMetadata {
  #[serde(default)]
  pub vector_layers: Option<Vec<VectorLayerInfo>>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
  let trimmed = value?.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl TileMetadata {
  /// The sub-layer to draw by default: the first non-blank `id`, otherwise the
  /// first non-blank `name`.
  pub fn default_vector_layer(&self) -> Option<String> {
    let layers = self.vector_layers.as_ref()?;
    layers
      .iter()
      .find_map(|layer| non_blank(layer.id.as_ref()))
      .or_else(|| layers.iter().find_map(|layer| non_blank(layer.name.as_ref())))
  }
}
