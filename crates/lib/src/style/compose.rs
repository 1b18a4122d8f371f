//! Composition of namespaced bundles into one style document.
//!
//! Composition is additive: [`merge`] only appends sources and layers. To
//! re-compose a namespace, its previous contributions are removed with
//! [`retract`] first.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::namespace::NamespacedBundle;
use super::types::{StyleDocument, Visibility};

/// Errors that can occur when merging a bundle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
  /// The composed document already has a source with this id.
  #[error("source '{0}' is already present in the composed style")]
  DuplicateSource(String),

  /// The composed document already has a layer with this id.
  #[error("layer '{0}' is already present in the composed style")]
  DuplicateLayer(String),
}

/// What a bundle contributed to a composed document.
///
/// Kept by callers so the contribution can be retracted before the same
/// namespace is merged again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleFootprint {
  pub namespace: String,
  pub source_ids: Vec<String>,
  pub layer_ids: Vec<String>,
  /// Original per-layer visibility, see [`NamespacedBundle::visibility`].
  pub visibility: BTreeMap<String, Visibility>,
}

impl From<&NamespacedBundle> for BundleFootprint {
  fn from(bundle: &NamespacedBundle) -> Self {
    Self {
      namespace: bundle.namespace.clone(),
      source_ids: bundle.source_ids.clone(),
      layer_ids: bundle.layer_ids.clone(),
      visibility: bundle.visibility.clone(),
    }
  }
}

/// Appends `bundle`'s sources and layers to `composed`.
///
/// Layers are appended in bundle order after everything already present.
/// Nothing is reordered or removed. A bundle that would reuse an id already in
/// `composed` is rejected before any change is made. The bundle's sprite and
/// glyphs are adopted only if `composed` has none yet.
pub fn merge(composed: &mut StyleDocument, bundle: &NamespacedBundle) -> Result<BundleFootprint, ComposeError> {
  if let Some(id) = bundle.sources.keys().find(|id| composed.sources.contains_key(id)) {
    return Err(ComposeError::DuplicateSource(id.to_string()));
  }

  let existing: BTreeSet<&str> = composed.layer_ids().collect();
  if let Some(layer) = bundle.layers.iter().find(|l| existing.contains(l.id.as_str())) {
    return Err(ComposeError::DuplicateLayer(layer.id.clone()));
  }

  for (id, source) in bundle.sources.iter() {
    composed.sources.insert(id, source.clone());
  }
  composed.layers.extend(bundle.layers.iter().cloned());

  if composed.sprite.is_none() {
    composed.sprite = bundle.sprite.clone();
  }
  if composed.glyphs.is_none() {
    composed.glyphs = bundle.glyphs.clone();
  }

  debug!(
    namespace = %bundle.namespace,
    sources = bundle.source_ids.len(),
    layers = bundle.layer_ids.len(),
    "merged bundle into composed style"
  );

  Ok(BundleFootprint::from(bundle))
}

/// Removes every layer and source `footprint` contributed to `composed`.
///
/// The relative order of the remaining layers and sources is unchanged. Ids
/// that are already gone are ignored.
pub fn retract(composed: &mut StyleDocument, footprint: &BundleFootprint) {
  let layer_ids: BTreeSet<&str> = footprint.layer_ids.iter().map(String::as_str).collect();
  let before = composed.layers.len();
  composed.layers.retain(|layer| !layer_ids.contains(layer.id.as_str()));

  let mut sources_removed = 0;
  for id in &footprint.source_ids {
    if composed.sources.remove(id).is_some() {
      sources_removed += 1;
    }
  }

  debug!(
    namespace = %footprint.namespace,
    layers_removed = before - composed.layers.len(),
    sources_removed,
    "retracted bundle from composed style"
  );
}

/// Collects the namespaced layer ids of every bundle.
pub fn collect_layer_ids<'a>(bundles: impl IntoIterator<Item = &'a NamespacedBundle>) -> BTreeSet<String> {
  bundles
    .into_iter()
    .flat_map(|bundle| bundle.layer_ids.iter().cloned())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::style::namespace::{NamespaceOptions, namespace_style};
  use crate::style::types::{LayerDef, SourceDef, Sprite};

  fn osm_style() -> StyleDocument {
    let mut style = StyleDocument::named("OpenStreetMap");
    style.sources.insert(
      "osm",
      SourceDef::with_tiles("raster", vec!["https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()]),
    );
    style.layers.push(LayerDef::new("osm-basemap", "raster").with_source("osm"));
    style
  }

  fn vector_style() -> StyleDocument {
    let mut style = StyleDocument::default();
    style.sources.insert("base", SourceDef::with_url("vector", "https://example.com/a.json"));
    style.sources.insert("hills", SourceDef::with_url("raster-dem", "https://example.com/b.json"));
    style.layers.push(LayerDef::new("water", "fill").with_source("base"));
    style.layers.push(LayerDef::new("roads", "line").with_source("base"));
    style.layers.push(LayerDef::new("hillshade", "hillshade").with_source("hills"));
    style
  }

  #[test]
  fn merges_into_empty_document() {
    let mut composed = StyleDocument::default();
    let bundle = namespace_style("osm", &osm_style(), NamespaceOptions::default());

    merge(&mut composed, &bundle).unwrap();

    assert!(composed.sources.contains_key("osm::osm"));
    let layer = composed.layer("osm::osm-basemap").unwrap();
    assert_eq!(layer.source.as_deref(), Some("osm::osm"));
    assert!(composed.reference_issues().is_empty());
  }

  #[test]
  fn two_namespaces_never_collide() {
    let style = vector_style();
    let mut composed = StyleDocument::default();

    merge(&mut composed, &namespace_style("a", &style, NamespaceOptions::default())).unwrap();
    merge(&mut composed, &namespace_style("b", &style, NamespaceOptions::default())).unwrap();

    let source_keys: BTreeSet<&str> = composed.sources.keys().collect();
    assert_eq!(source_keys.len(), composed.sources.len());
    assert_eq!(source_keys.len(), 2 * style.sources.len());

    let layer_ids: BTreeSet<&str> = composed.layer_ids().collect();
    assert_eq!(layer_ids.len(), 2 * style.layers.len());
    assert!(composed.reference_issues().is_empty());
  }

  #[test]
  fn appends_after_existing_layers() {
    let mut composed = StyleDocument::default();
    composed.layers.push(LayerDef::new("existing", "background"));

    merge(&mut composed, &namespace_style("v", &vector_style(), NamespaceOptions::default())).unwrap();

    let ids: Vec<_> = composed.layer_ids().collect();
    assert_eq!(ids, vec!["existing", "v::water", "v::roads", "v::hillshade"]);
  }

  #[test]
  fn rejects_duplicates_without_mutating() {
    let mut composed = StyleDocument::default();
    let bundle = namespace_style("osm", &osm_style(), NamespaceOptions::default());
    merge(&mut composed, &bundle).unwrap();
    let snapshot = composed.clone();

    let err = merge(&mut composed, &bundle).unwrap_err();
    assert_eq!(err, ComposeError::DuplicateSource("osm::osm".to_string()));
    assert_eq!(composed, snapshot);
  }

  #[test]
  fn retract_then_merge_does_not_accumulate() {
    let style = vector_style();
    let mut composed = StyleDocument::default();
    merge(&mut composed, &namespace_style("other", &osm_style(), NamespaceOptions::default())).unwrap();

    let footprint = merge(&mut composed, &namespace_style("v", &style, NamespaceOptions::default())).unwrap();
    retract(&mut composed, &footprint);
    merge(&mut composed, &namespace_style("v", &style, NamespaceOptions { visible: false })).unwrap();

    assert_eq!(composed.layers.len(), 1 + style.layers.len());
    assert_eq!(composed.sources.len(), 1 + style.sources.len());
    assert_eq!(composed.layers[0].id, "other::osm-basemap");
    assert_eq!(composed.layer("v::water").unwrap().visibility(), Visibility::None);
  }

  #[test]
  fn first_bundle_sprite_wins() {
    let mut first = osm_style();
    first.sprite = Some(Sprite::Url("https://a/sprite".to_string()));
    let mut second = vector_style();
    second.sprite = Some(Sprite::Url("https://b/sprite".to_string()));
    second.glyphs = Some("https://b/{fontstack}/{range}.pbf".to_string());

    let mut composed = StyleDocument::default();
    merge(&mut composed, &namespace_style("a", &first, NamespaceOptions::default())).unwrap();
    merge(&mut composed, &namespace_style("b", &second, NamespaceOptions::default())).unwrap();

    assert_eq!(composed.sprite, Some(Sprite::Url("https://a/sprite".to_string())));
    assert_eq!(composed.glyphs.as_deref(), Some("https://b/{fontstack}/{range}.pbf"));
  }

  #[test]
  fn collects_layer_ids_across_bundles() {
    let a = namespace_style("a", &osm_style(), NamespaceOptions::default());
    let b = namespace_style("b", &vector_style(), NamespaceOptions::default());

    let ids = collect_layer_ids([&a, &b]);
    assert_eq!(ids.len(), 4);
    assert!(ids.contains("a::osm-basemap"));
    assert!(ids.contains("b::hillshade"));
  }
}
