//! Style namespacing.
//!
//! Several independently authored style documents can only share one renderer
//! if their source and layer ids cannot collide. [`namespace_style`] prefixes
//! every id with `<namespace>::` and rewrites internal references to match,
//! producing a [`NamespacedBundle`] that the composer appends to a composed
//! document.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::consts::{META_BASEMAP_ID, META_LAYER_ROLE, NAMESPACE_SEPARATOR};

use super::types::{LayerDef, PropertyMap, SourceMap, Sprite, StyleDocument, Visibility};

/// Options for [`namespace_style`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceOptions {
  /// Whether the bundle's layers should start out visible.
  pub visible: bool,
}

impl Default for NamespaceOptions {
  fn default() -> Self {
    Self { visible: true }
  }
}

/// A style document with every id prefixed by a namespace token.
///
/// Bundles are produced fresh for every (namespace, visibility) change and are
/// not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespacedBundle {
  pub namespace: String,

  /// Namespaced sources, in the original document's order.
  pub sources: SourceMap,

  pub source_ids: Vec<String>,

  /// Namespaced layers, in paint order.
  pub layers: Vec<LayerDef>,

  pub layer_ids: Vec<String>,

  pub sprite: Option<Sprite>,

  pub glyphs: Option<String>,

  /// Visibility each layer's author declared, keyed by namespaced layer id.
  ///
  /// This is independent of the visibility the bundle was emitted with.
  pub visibility: BTreeMap<String, Visibility>,
}

/// Prefixes `id` with `namespace`.
pub fn namespaced_id(namespace: &str, id: &str) -> String {
  format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, id)
}

/// Builds a [`NamespacedBundle`] from `style`.
///
/// `style` is cloned before anything is renamed, so the caller can namespace
/// the same document again later. Layer order is preserved because later
/// layers paint on top of earlier ones.
pub fn namespace_style(namespace: &str, style: &StyleDocument, options: NamespaceOptions) -> NamespacedBundle {
  let doc = style.clone();

  let mut sources = SourceMap::new();
  let mut source_ids = Vec::with_capacity(doc.sources.len());
  for (id, source) in doc.sources {
    let prefixed = namespaced_id(namespace, &id);
    source_ids.push(prefixed.clone());
    sources.insert(prefixed, source);
  }

  let renames: HashMap<String, String> = doc
    .layers
    .iter()
    .map(|layer| (layer.id.clone(), namespaced_id(namespace, &layer.id)))
    .collect();

  let mut layers = Vec::with_capacity(doc.layers.len());
  let mut layer_ids = Vec::with_capacity(doc.layers.len());
  let mut visibility = BTreeMap::new();

  for mut layer in doc.layers {
    let prefixed = renames[layer.id.as_str()].clone();
    visibility.insert(prefixed.clone(), layer.visibility());
    layer.id = prefixed.clone();

    if let Some(source) = layer.source.take() {
      let prefixed_source = namespaced_id(namespace, &source);
      layer.source = Some(if sources.contains_key(&prefixed_source) {
        prefixed_source
      } else {
        source
      });
    }

    if let Some(target) = layer.reference.take() {
      layer.reference = Some(renames.get(target.as_str()).cloned().unwrap_or(target));
    }

    let metadata = layer.metadata.get_or_insert_with(PropertyMap::new);
    metadata.insert(META_LAYER_ROLE.to_string(), Value::from("basemap"));
    metadata.insert(META_BASEMAP_ID.to_string(), Value::from(namespace));

    layer_ids.push(prefixed);
    layers.push(layer);
  }

  if !options.visible {
    for layer in &mut layers {
      layer.set_visibility(Visibility::None);
    }
  }

  NamespacedBundle {
    namespace: namespace.to_string(),
    sources,
    source_ids,
    layers,
    layer_ids,
    sprite: doc.sprite,
    glyphs: doc.glyphs,
    visibility,
  }
}
