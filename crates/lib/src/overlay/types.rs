//! Overlay layer descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{META_LAYER_ROLE, TILE_ARCHIVE_SCHEME};
use crate::style::{LayerDef, PropertyMap, SourceDef};

use super::metadata::TileMetadata;

/// Renderer layer types an overlay can be drawn as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
  Background,
  Fill,
  Line,
  Symbol,
  Circle,
  Heatmap,
  FillExtrusion,
  Raster,
  Hillshade,
}

impl LayerType {
  pub fn as_str(self) -> &'static str {
    match self {
      LayerType::Background => "background",
      LayerType::Fill => "fill",
      LayerType::Line => "line",
      LayerType::Symbol => "symbol",
      LayerType::Circle => "circle",
      LayerType::Heatmap => "heatmap",
      LayerType::FillExtrusion => "fill-extrusion",
      LayerType::Raster => "raster",
      LayerType::Hillshade => "hillshade",
    }
  }
}

impl fmt::Display for LayerType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Kind of tile data behind an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
  #[default]
  Vector,
  Raster,
}

impl SourceKind {
  pub fn as_str(self) -> &'static str {
    match self {
      SourceKind::Vector => "vector",
      SourceKind::Raster => "raster",
    }
  }

  /// Raster and hillshade layers draw raster tiles; everything else reads vector tiles.
  pub fn for_layer_type(layer_type: LayerType) -> Self {
    match layer_type {
      LayerType::Raster | LayerType::Hillshade => SourceKind::Raster,
      _ => SourceKind::Vector,
    }
  }
}

/// What a layer is for, recorded in its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
  Background,
  Basemap,
  #[default]
  Foreground,
}

impl LayerRole {
  pub fn as_str(self) -> &'static str {
    match self {
      LayerRole::Background => "background",
      LayerRole::Basemap => "basemap",
      LayerRole::Foreground => "foreground",
    }
  }
}

/// Default source id for an overlay: `<id>-source`.
pub fn default_source_id(layer_id: &str) -> String {
  format!("{}-source", layer_id)
}

/// One overlay the caller wants on the map.
///
/// Overlays are matched by `id`; a changed `url` means a new dataset version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayLayer {
  pub id: String,

  /// Tile archive URL, without the scheme token.
  pub url: String,

  pub layer_type: LayerType,

  #[serde(default)]
  pub source_type: SourceKind,

  /// Vector sub-layer to draw. Required before a vector overlay can be added.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_layer: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub paint: Option<PropertyMap>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub layout: Option<PropertyMap>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub minzoom: Option<f64>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub maxzoom: Option<f64>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<PropertyMap>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<LayerRole>,
}

impl OverlayLayer {
  /// An overlay whose source kind is inferred from its layer type.
  pub fn new(id: impl Into<String>, url: impl Into<String>, layer_type: LayerType) -> Self {
    Self {
      id: id.into(),
      url: url.into(),
      layer_type,
      source_type: SourceKind::for_layer_type(layer_type),
      source_layer: None,
      paint: None,
      layout: None,
      minzoom: None,
      maxzoom: None,
      metadata: None,
      role: None,
    }
  }

  pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
    self.source_layer = Some(source_layer.into());
    self
  }

  pub fn with_paint(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self
      .paint
      .get_or_insert_with(PropertyMap::new)
      .insert(key.into(), value.into());
    self
  }

  pub fn with_layout(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self
      .layout
      .get_or_insert_with(PropertyMap::new)
      .insert(key.into(), value.into());
    self
  }

  /// The sub-layer name, if one is set and not blank.
  pub fn source_layer_name(&self) -> Option<&str> {
    self.source_layer.as_deref().map(str::trim).filter(|name| !name.is_empty())
  }

  /// True while a vector overlay has no sub-layer to draw.
  pub fn awaits_source_layer(&self) -> bool {
    self.source_type == SourceKind::Vector && self.source_layer_name().is_none()
  }

  /// Fills a missing sub-layer name from the archive's metadata.
  ///
  /// Returns true if the sub-layer was set by this call.
  pub fn resolve_source_layer(&mut self, metadata: &TileMetadata) -> bool {
    if self.source_layer_name().is_some() {
      return false;
    }
    match metadata.default_vector_layer() {
      Some(layer) => {
        self.source_layer = Some(layer);
        true
      }
      None => false,
    }
  }

  /// The source URL as registered with the renderer.
  pub fn source_url(&self) -> String {
    format!("{}{}", TILE_ARCHIVE_SCHEME, self.url)
  }

  pub fn source_def(&self) -> SourceDef {
    SourceDef::with_url(self.source_type.as_str(), self.source_url())
  }

  /// The layer definition added to the renderer for this overlay.
  pub fn layer_def(&self, source_id: &str) -> LayerDef {
    let mut metadata = self.metadata.clone().unwrap_or_default();
    metadata.insert(
      META_LAYER_ROLE.to_string(),
      Value::from(self.role.unwrap_or_default().as_str()),
    );

    let mut layer = LayerDef::new(self.id.clone(), self.layer_type.as_str()).with_source(source_id);
    layer.source_layer = self.source_layer_name().map(str::to_string);
    layer.paint = Some(self.paint.clone().unwrap_or_default());
    layer.layout = Some(self.layout.clone().unwrap_or_default());
    layer.minzoom = self.minzoom;
    layer.maxzoom = self.maxzoom;
    layer.metadata = Some(metadata);
    layer
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn parses_camel_case_descriptor() {
    let overlay: OverlayLayer = serde_json::from_value(json!({
      "id": "d1",
      "url": "https://x/a.pmtiles",
      "layerType": "fill-extrusion",
      "sourceType": "vector",
      "sourceLayer": "buildings",
      "paint": { "fill-extrusion-color": "#abcdef" }
    }))
    .unwrap();

    assert_eq!(overlay.layer_type, LayerType::FillExtrusion);
    assert_eq!(overlay.source_layer.as_deref(), Some("buildings"));
    assert!(overlay.layout.is_none());
  }

  #[test]
  fn source_type_defaults_to_vector() {
    let overlay: OverlayLayer =
      serde_json::from_value(json!({ "id": "r", "url": "u", "layerType": "raster" })).unwrap();
    assert_eq!(overlay.source_type, SourceKind::Vector);
    assert_eq!(OverlayLayer::new("r", "u", LayerType::Raster).source_type, SourceKind::Raster);
    assert_eq!(SourceKind::for_layer_type(LayerType::Hillshade), SourceKind::Raster);
    assert_eq!(SourceKind::for_layer_type(LayerType::Circle), SourceKind::Vector);
  }

  #[test]
  fn source_url_carries_scheme_token() {
    let overlay = OverlayLayer::new("d1", "https://x/a.pmtiles", LayerType::Fill);
    assert_eq!(overlay.source_url(), "pmtiles://https://x/a.pmtiles");
    assert_eq!(overlay.source_def().kind, "vector");
    assert_eq!(default_source_id("d1"), "d1-source");
  }

  #[test]
  fn layer_def_merges_metadata_with_role() {
    let mut overlay = OverlayLayer::new("d1", "https://x/a.pmtiles", LayerType::Line)
      .with_source_layer("roads")
      .with_paint("line-width", 2);
    let mut meta = PropertyMap::new();
    meta.insert("name".to_string(), json!("Roads"));
    overlay.metadata = Some(meta);
    overlay.minzoom = Some(4.0);

    let layer = overlay.layer_def("d1-source");

    assert_eq!(layer.kind.as_deref(), Some("line"));
    assert_eq!(layer.source.as_deref(), Some("d1-source"));
    assert_eq!(layer.source_layer.as_deref(), Some("roads"));
    assert_eq!(layer.minzoom, Some(4.0));
    assert_eq!(layer.metadata_str("name"), Some("Roads"));
    assert_eq!(layer.metadata_str(META_LAYER_ROLE), Some("foreground"));
    assert!(layer.layout.as_ref().unwrap().is_empty());
  }

  #[test]
  fn declared_role_wins_over_default() {
    let mut overlay = OverlayLayer::new("bg", "https://x/b.pmtiles", LayerType::Raster);
    overlay.role = Some(LayerRole::Background);
    assert_eq!(
      overlay.layer_def("bg-source").metadata_str(META_LAYER_ROLE),
      Some("background")
    );
  }

  #[test]
  fn awaits_source_layer_only_for_vector() {
    assert!(OverlayLayer::new("v", "u", LayerType::Fill).awaits_source_layer());
    assert!(!OverlayLayer::new("v", "u", LayerType::Fill).with_source_layer("x").awaits_source_layer());
    assert!(!OverlayLayer::new("r", "u", LayerType::Raster).awaits_source_layer());
  }

  #[test]
  fn blank_source_layer_counts_as_missing() {
    let mut overlay: OverlayLayer = serde_json::from_value(json!({
      "id": "v",
      "url": "https://x/v.pmtiles",
      "layerType": "fill",
      "sourceType": "vector",
      "sourceLayer": "  "
    }))
    .unwrap();
    assert!(overlay.awaits_source_layer());
    assert_eq!(overlay.source_layer_name(), None);

    let metadata: TileMetadata = serde_json::from_value(json!({ "vector_layers": [{ "id": "land" }] })).unwrap();
    assert!(overlay.resolve_source_layer(&metadata));
    assert_eq!(overlay.source_layer_name(), Some("land"));
    assert!(!overlay.awaits_source_layer());
  }
}
