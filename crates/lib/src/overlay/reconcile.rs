//! Overlay reconciliation.
//!
//! Each call runs in three passes:
//! 1. Removal: overlays this engine attached that are no longer wanted, or
//!    whose layer vanished from the renderer, are detached (layer first, then
//!    source) and forgotten.
//! 2. Per overlay, in caller order: reload on URL change, register the source
//!    if missing, then add the layer or refresh its properties.
//! 3. Diagnostics: the resulting layer order is captured in the report.
//!
//! Running the same desired list twice performs no structural changes the
//! second time.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::consts::META_NAME;
use crate::style::{StyleDocument, Visibility};
use crate::surface::{MapSurface, SurfaceError};

use super::ledger::{AttachmentLedger, AttachmentState};
use super::types::{OverlayLayer, default_source_id};

/// One renderer layer in paint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
  pub order: usize,
  pub id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_layer: Option<String>,
  pub visibility: Visibility,
}

/// Summarizes the layer stack of a style, bottom first.
pub fn layer_order(style: &StyleDocument) -> Vec<LayerSummary> {
  style
    .layers
    .iter()
    .enumerate()
    .map(|(order, layer)| LayerSummary {
      order,
      id: layer.id.clone(),
      name: layer.metadata_str(META_NAME).map(str::to_string),
      source: layer.source.clone(),
      source_layer: layer.source_layer.clone(),
      visibility: layer.visibility(),
    })
    .collect()
}

/// A renderer mutation that failed for one overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileFailure {
  pub id: String,
  #[serde(serialize_with = "display")]
  pub error: SurfaceError,
}

fn display<S: serde::Serializer>(error: &SurfaceError, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.collect_str(error)
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
  /// Overlays detached in the removal pass.
  pub removed: Vec<String>,

  /// Overlays detached because their URL changed.
  pub reloaded: Vec<String>,

  /// Source ids registered with the renderer.
  pub sources_added: Vec<String>,

  pub layers_added: Vec<String>,

  /// Already-live overlays whose paint and layout were rewritten.
  pub updated: Vec<String>,

  /// Vector overlays left without a layer until their sub-layer is known.
  pub deferred: Vec<String>,

  pub failed: Vec<ReconcileFailure>,

  pub layer_order: Vec<LayerSummary>,
}

impl ReconcileReport {
  /// Returns true if no layer or source was added or removed.
  pub fn is_noop(&self) -> bool {
    self.removed.is_empty() && self.reloaded.is_empty() && self.sources_added.is_empty() && self.layers_added.is_empty()
  }
}

/// Hook invoked before an overlay's source is registered.
pub type SourceHook<'h> = Box<dyn FnMut(&OverlayLayer) + 'h>;

/// Applies desired overlay lists to a renderer.
///
/// The reconciler holds configuration only; the [`AttachmentLedger`] is owned
/// by whoever owns the renderer and is passed into every call.
pub struct Reconciler<'h> {
  source_id: fn(&str) -> String,
  prepare_source: Option<SourceHook<'h>>,
}

impl Default for Reconciler<'_> {
  fn default() -> Self {
    Self::new()
  }
}

impl<'h> Reconciler<'h> {
  pub fn new() -> Self {
    Self {
      source_id: default_source_id,
      prepare_source: None,
    }
  }

  /// Overrides how source ids are derived from overlay ids.
  pub fn with_source_ids(mut self, source_id: fn(&str) -> String) -> Self {
    self.source_id = source_id;
    self
  }

  /// Registers a hook run before each source registration, e.g. to install
  /// the archive protocol handler.
  pub fn with_source_hook(mut self, hook: impl FnMut(&OverlayLayer) + 'h) -> Self {
    self.prepare_source = Some(Box::new(hook));
    self
  }

  pub fn source_id(&self, layer_id: &str) -> String {
    (self.source_id)(layer_id)
  }

  /// Brings `surface` in line with `desired`, updating `ledger` to match.
  ///
  /// Renderer failures for one overlay are logged and reported; the remaining
  /// overlays are still processed.
  pub fn reconcile<S: MapSurface + ?Sized>(
    &mut self,
    surface: &mut S,
    ledger: &mut AttachmentLedger,
    desired: &[OverlayLayer],
  ) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let wanted: HashSet<&str> = desired.iter().map(|overlay| overlay.id.as_str()).collect();

    for id in ledger.ids() {
      let state = ledger.state(&id);
      let stale = match &state {
        AttachmentState::Attached(_) => !wanted.contains(id.as_str()) || !surface.has_layer(&id),
        AttachmentState::SourceStaged(_) => !wanted.contains(id.as_str()),
        AttachmentState::Unattached => false,
      };
      if !stale {
        continue;
      }
      let source_id = state.source_id().map(str::to_string).unwrap_or_else(|| self.source_id(&id));
      info!(layer = %id, source = %source_id, "removing overlay");
      detach(surface, &id, &source_id);
      ledger.forget(&id);
      report.removed.push(id);
    }

    for overlay in desired {
      self.apply(surface, ledger, overlay, &mut report);
    }

    report.layer_order = layer_order(&surface.style());
    debug!(layers = ?report.layer_order, "current layer order");

    info!(
      removed = report.removed.len(),
      reloaded = report.reloaded.len(),
      added = report.layers_added.len(),
      deferred = report.deferred.len(),
      failed = report.failed.len(),
      "reconciliation complete"
    );

    report
  }

  fn apply<S: MapSurface + ?Sized>(
    &mut self,
    surface: &mut S,
    ledger: &mut AttachmentLedger,
    overlay: &OverlayLayer,
    report: &mut ReconcileReport,
  ) {
    let id = overlay.id.as_str();
    let source_id = self.source_id(id);

    if let Some(previous) = ledger.get(id).and_then(|state| state.layer_state()).cloned() {
      if previous.url != overlay.url {
        info!(layer = %id, from = %previous.url, to = %overlay.url, "overlay url changed, reloading");
        detach(surface, id, &previous.source_id);
        ledger.forget(id);
        report.reloaded.push(id.to_string());
      }
    }

    if !surface.has_source(&source_id) {
      if let Some(hook) = self.prepare_source.as_mut() {
        hook(overlay);
      }
      info!(layer = %id, source = %source_id, url = %overlay.url, "adding overlay source");
      if let Err(e) = surface.add_source(&source_id, overlay.source_def()) {
        warn!(layer = %id, error = %e, "failed to add overlay source");
        ledger.forget(id);
        report.failed.push(ReconcileFailure {
          id: id.to_string(),
          error: e,
        });
        return;
      }
      report.sources_added.push(source_id.clone());
    }

    if surface.has_layer(id) {
      self.refresh_properties(surface, overlay, report);
      report.updated.push(id.to_string());
      ledger.attach(id, source_id, overlay.url.clone());
      return;
    }

    if overlay.awaits_source_layer() {
      debug!(layer = %id, "vector overlay has no source layer yet, deferring");
      ledger.stage(id, source_id, overlay.url.clone());
      report.deferred.push(id.to_string());
      return;
    }

    info!(layer = %id, kind = %overlay.layer_type, "adding overlay layer");
    match surface.add_layer(overlay.layer_def(&source_id)) {
      Ok(()) => {
        ledger.attach(id, source_id, overlay.url.clone());
        report.layers_added.push(id.to_string());
      }
      Err(e) => {
        warn!(layer = %id, error = %e, "failed to add overlay layer");
        ledger.forget(id);
        report.failed.push(ReconcileFailure {
          id: id.to_string(),
          error: e,
        });
      }
    }
  }

  fn refresh_properties<S: MapSurface + ?Sized>(
    &self,
    surface: &mut S,
    overlay: &OverlayLayer,
    report: &mut ReconcileReport,
  ) {
    let id = overlay.id.as_str();
    let paint = overlay.paint.iter().flatten();
    let layout = overlay.layout.iter().flatten();

    for (key, value) in paint {
      if let Err(e) = surface.set_paint_property(id, key, value.clone()) {
        warn!(layer = %id, property = %key, error = %e, "failed to update paint property");
        report.failed.push(ReconcileFailure {
          id: id.to_string(),
          error: e,
        });
      }
    }
    for (key, value) in layout {
      if let Err(e) = surface.set_layout_property(id, key, value.clone()) {
        warn!(layer = %id, property = %key, error = %e, "failed to update layout property");
        report.failed.push(ReconcileFailure {
          id: id.to_string(),
          error: e,
        });
      }
    }
  }
}

/// Removes a layer, then its source. Either may already be gone.
fn detach<S: MapSurface + ?Sized>(surface: &mut S, layer_id: &str, source_id: &str) {
  let layer_removed = surface.remove_layer(layer_id);
  let source_removed = surface.remove_source(source_id);
  debug!(layer = %layer_id, layer_removed, source_removed, "detached overlay");
}
