//! Style document data model.
//!
//! Only the fields this crate reads or rewrites are typed. Everything else a
//! renderer understands (filters, attribution, terrain, ...) is carried through
//! untouched in the `extra` maps so a document survives a parse/serialize
//! round-trip.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Free-form property bag (`paint`, `layout`, `metadata`, unknown fields).
pub type PropertyMap = Map<String, Value>;

/// Style format version written when a document omits it.
pub const STYLE_VERSION: u8 = 8;

/// Errors that can occur when reading or writing style documents.
#[derive(Debug, Error)]
pub enum StyleError {
  /// Failed to parse style JSON.
  #[error("failed to parse style document: {0}")]
  Parse(#[source] serde_json::Error),

  /// Failed to serialize style JSON.
  #[error("failed to serialize style document: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// Layer visibility as written in `layout.visibility`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
  #[default]
  Visible,
  None,
}

impl Visibility {
  pub fn as_str(self) -> &'static str {
    match self {
      Visibility::Visible => "visible",
      Visibility::None => "none",
    }
  }

  /// Reads visibility from a layout map. Only an explicit `"none"` hides a layer.
  pub fn from_layout(layout: Option<&PropertyMap>) -> Self {
    match layout.and_then(|l| l.get("visibility")).and_then(Value::as_str) {
      Some("none") => Visibility::None,
      _ => Visibility::Visible,
    }
  }
}

impl fmt::Display for Visibility {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<Visibility> for Value {
  fn from(visibility: Visibility) -> Self {
    Value::String(visibility.as_str().to_string())
  }
}

/// A named data origin referenced by layers.
///
/// Either tile-template based (`tiles`) or metadata-URL based (`url`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDef {
  /// Source type (`vector`, `raster`, `raster-dem`, `geojson`, ...).
  #[serde(rename = "type")]
  pub kind: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tiles: Option<Vec<String>>,

  #[serde(flatten)]
  pub extra: PropertyMap,
}

impl SourceDef {
  /// A URL-based source of the given type.
  pub fn with_url(kind: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      url: Some(url.into()),
      tiles: None,
      extra: PropertyMap::new(),
    }
  }

  /// A tile-template based source of the given type.
  pub fn with_tiles(kind: impl Into<String>, tiles: Vec<String>) -> Self {
    Self {
      kind: kind.into(),
      url: None,
      tiles: Some(tiles),
      extra: PropertyMap::new(),
    }
  }
}

/// A drawable unit of a style document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
  pub id: String,

  /// Layer type. Legacy `ref` layers may omit it and inherit from their target.
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,

  #[serde(rename = "source-layer", default, skip_serializing_if = "Option::is_none")]
  pub source_layer: Option<String>,

  /// Alias to another layer in the same document, inheriting its source.
  #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
  pub reference: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub minzoom: Option<f64>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub maxzoom: Option<f64>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub layout: Option<PropertyMap>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub paint: Option<PropertyMap>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<PropertyMap>,

  #[serde(flatten)]
  pub extra: PropertyMap,
}

impl LayerDef {
  pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      kind: Some(kind.into()),
      source: None,
      source_layer: None,
      reference: None,
      minzoom: None,
      maxzoom: None,
      layout: None,
      paint: None,
      metadata: None,
      extra: PropertyMap::new(),
    }
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }

  /// The visibility this layer's author declared.
  pub fn visibility(&self) -> Visibility {
    Visibility::from_layout(self.layout.as_ref())
  }

  /// Writes `layout.visibility`, creating the layout map if needed.
  pub fn set_visibility(&mut self, visibility: Visibility) {
    self
      .layout
      .get_or_insert_with(PropertyMap::new)
      .insert("visibility".to_string(), visibility.into());
  }

  /// Reads a string value from this layer's metadata.
  pub fn metadata_str(&self, key: &str) -> Option<&str> {
    self.metadata.as_ref()?.get(key)?.as_str()
  }
}

/// One entry of a multi-sprite declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteSheet {
  pub id: String,
  pub url: String,
}

/// The `sprite` field: a single base URL or a list of named sprite sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sprite {
  Url(String),
  Sheets(Vec<SpriteSheet>),
}

/// Ordered mapping of source id to source definition.
///
/// Insertion order is kept so that a document serializes back the way it was
/// authored and namespaced source ids come out in a stable order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
  entries: Vec<(String, SourceDef)>,
}

impl SourceMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, id: &str) -> Option<&SourceDef> {
    self.entries.iter().find(|(k, _)| k == id).map(|(_, v)| v)
  }

  pub fn get_mut(&mut self, id: &str) -> Option<&mut SourceDef> {
    self.entries.iter_mut().find(|(k, _)| k == id).map(|(_, v)| v)
  }

  pub fn contains_key(&self, id: &str) -> bool {
    self.get(id).is_some()
  }

  /// Inserts a source. An existing entry keeps its position and is replaced;
  /// the previous definition is returned.
  pub fn insert(&mut self, id: impl Into<String>, source: SourceDef) -> Option<SourceDef> {
    let id = id.into();
    match self.get_mut(&id) {
      Some(existing) => Some(std::mem::replace(existing, source)),
      None => {
        self.entries.push((id, source));
        None
      }
    }
  }

  /// Removes a source, keeping the order of the remaining entries.
  pub fn remove(&mut self, id: &str) -> Option<SourceDef> {
    let index = self.entries.iter().position(|(k, _)| k == id)?;
    Some(self.entries.remove(index).1)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceDef)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut SourceDef)> {
    self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
  }
}

impl FromIterator<(String, SourceDef)> for SourceMap {
  fn from_iter<I: IntoIterator<Item = (String, SourceDef)>>(iter: I) -> Self {
    let mut map = SourceMap::new();
    for (id, source) in iter {
      map.insert(id, source);
    }
    map
  }
}

impl IntoIterator for SourceMap {
  type Item = (String, SourceDef);
  type IntoIter = std::vec::IntoIter<(String, SourceDef)>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_iter()
  }
}

impl Serialize for SourceMap {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (id, source) in &self.entries {
      map.serialize_entry(id, source)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for SourceMap {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct SourceMapVisitor;

    impl<'de> Visitor<'de> for SourceMapVisitor {
      type Value = SourceMap;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of source id to source definition")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = SourceMap::new();
        while let Some((id, source)) = access.next_entry::<String, SourceDef>()? {
          map.insert(id, source);
        }
        Ok(map)
      }
    }

    deserializer.deserialize_map(SourceMapVisitor)
  }
}

fn default_version() -> u8 {
  STYLE_VERSION
}

/// A declarative description of map sources and layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDocument {
  #[serde(default = "default_version")]
  pub version: u8,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sprite: Option<Sprite>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub glyphs: Option<String>,

  #[serde(default)]
  pub sources: SourceMap,

  #[serde(default)]
  pub layers: Vec<LayerDef>,

  #[serde(flatten)]
  pub extra: PropertyMap,
}

impl Default for StyleDocument {
  fn default() -> Self {
    Self {
      version: STYLE_VERSION,
      name: None,
      sprite: None,
      glyphs: None,
      sources: SourceMap::new(),
      layers: Vec::new(),
      extra: PropertyMap::new(),
    }
  }
}

/// A broken cross-reference inside a style document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceIssue {
  /// A layer names a source that is not in the document.
  MissingSource { layer: String, source: String },
  /// A layer's `ref` names a layer that is not in the document.
  MissingRef { layer: String, target: String },
  /// Two layers share an id.
  DuplicateLayer { layer: String },
}

impl StyleDocument {
  /// An empty style document with the given name.
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: Some(name.into()),
      ..Self::default()
    }
  }

  pub fn from_json(content: &str) -> Result<Self, StyleError> {
    serde_json::from_str(content).map_err(StyleError::Parse)
  }

  pub fn to_json_pretty(&self) -> Result<String, StyleError> {
    serde_json::to_string_pretty(self).map_err(StyleError::Serialize)
  }

  pub fn layer(&self, id: &str) -> Option<&LayerDef> {
    self.layers.iter().find(|l| l.id == id)
  }

  pub fn layer_mut(&mut self, id: &str) -> Option<&mut LayerDef> {
    self.layers.iter_mut().find(|l| l.id == id)
  }

  pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
    self.layers.iter().map(|l| l.id.as_str())
  }

  /// Checks that every `source` and `ref` resolves inside this document and
  /// that layer ids are unique.
  pub fn reference_issues(&self) -> Vec<ReferenceIssue> {
    let mut issues = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for layer in &self.layers {
      if !seen.insert(layer.id.as_str()) {
        issues.push(ReferenceIssue::DuplicateLayer { layer: layer.id.clone() });
      }
      if let Some(source) = &layer.source {
        if !self.sources.contains_key(source) {
          issues.push(ReferenceIssue::MissingSource {
            layer: layer.id.clone(),
            source: source.clone(),
          });
        }
      }
      if let Some(target) = &layer.reference {
        if self.layer(target).is_none() {
          issues.push(ReferenceIssue::MissingRef {
            layer: layer.id.clone(),
            target: target.clone(),
          });
        }
      }
    }

    issues
  }
}
