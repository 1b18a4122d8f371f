use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::style::{
  BundleFootprint, ComposeError, NamespaceOptions, StyleDocument, Visibility, merge, namespace_style, retract,
};
use crate::surface::{MapSurface, SurfaceError};

/// Composed basemap document plus what each namespace contributed to it.
///
/// Applying a namespace again first retracts its previous contribution, so a
/// namespace is never present twice. Re-applied namespaces move to the top of
/// the layer stack.
#[derive(Debug, Clone, Default)]
pub struct BasemapComposer {
  composed: StyleDocument,
  footprints: BTreeMap<String, BundleFootprint>,
}

impl BasemapComposer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts from an existing document, e.g. one carrying a name or sprite.
  pub fn with_base(composed: StyleDocument) -> Self {
    Self {
      composed,
      footprints: BTreeMap::new(),
    }
  }

  pub fn composed(&self) -> &StyleDocument {
    &self.composed
  }

  pub fn into_composed(self) -> StyleDocument {
    self.composed
  }

  pub fn footprint(&self, namespace: &str) -> Option<&BundleFootprint> {
    self.footprints.get(namespace)
  }

  pub fn namespaces(&self) -> impl Iterator<Item = &str> {
    self.footprints.keys().map(String::as_str)
  }

  /// Namespaces `style` under `namespace` and merges it.
  ///
  /// On a merge conflict the namespace's previous contribution stays retracted
  /// and nothing from `style` is added.
  pub fn apply(&mut self, namespace: &str, style: &StyleDocument, visible: bool) -> Result<&BundleFootprint, ComposeError> {
    if let Some(previous) = self.footprints.remove(namespace) {
      retract(&mut self.composed, &previous);
    }

    let bundle = namespace_style(namespace, style, NamespaceOptions { visible });
    let footprint = merge(&mut self.composed, &bundle)?;
    info!(namespace = %namespace, layers = footprint.layer_ids.len(), visible, "applied basemap");

    Ok(self.footprints.entry(namespace.to_string()).or_insert(footprint))
  }

  /// Removes a namespace's contribution. Returns false if it was not applied.
  pub fn remove(&mut self, namespace: &str) -> bool {
    match self.footprints.remove(namespace) {
      Some(footprint) => {
        retract(&mut self.composed, &footprint);
        true
      }
      None => false,
    }
  }

  /// Visibility writes that show or hide `namespace`.
  ///
  /// Showing restores each layer's declared visibility, so layers their author
  /// hid stay hidden.
  pub fn visibility_updates(&self, namespace: &str, visible: bool) -> Vec<(String, Visibility)> {
    let Some(footprint) = self.footprints.get(namespace) else {
      return Vec::new();
    };
    footprint
      .layer_ids
      .iter()
      .map(|id| {
        let visibility = if visible {
          footprint.visibility.get(id).copied().unwrap_or_default()
        } else {
          Visibility::None
        };
        (id.clone(), visibility)
      })
      .collect()
  }

  /// Shows or hides `namespace` in the composed document.
  pub fn set_visible(&mut self, namespace: &str, visible: bool) {
    for (id, visibility) in self.visibility_updates(namespace, visible) {
      if let Some(layer) = self.composed.layer_mut(&id) {
        layer.set_visibility(visibility);
      }
    }
  }

  /// Shows or hides `namespace` on a live renderer without re-adding anything.
  ///
  /// Layers missing from the renderer are skipped. Returns how many layers
  /// were updated.
  pub fn apply_visibility<S: MapSurface + ?Sized>(
    &self,
    surface: &mut S,
    namespace: &str,
    visible: bool,
  ) -> Result<usize, SurfaceError> {
    let mut updated = 0;
    for (id, visibility) in self.visibility_updates(namespace, visible) {
      if !surface.has_layer(&id) {
        debug!(layer = %id, "basemap layer not on renderer, skipping visibility update");
        continue;
      }
      surface.set_layout_property(&id, "visibility", visibility.into())?;
      updated += 1;
    }
    Ok(updated)
  }
}
