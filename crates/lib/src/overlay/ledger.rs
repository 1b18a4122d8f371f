//! Attachment ledger.
//!
//! Records which overlays this engine put on the renderer, so a later
//! reconciliation can tell its own layers from anything else on the map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Source id and archive URL an overlay was registered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerState {
  pub source_id: String,
  pub url: String,
}

/// Where an overlay stands on the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttachmentState {
  /// Not known to the renderer.
  Unattached,

  /// Source registered, layer waiting on a vector sub-layer name.
  SourceStaged(LayerState),

  /// Source and layer both live.
  Attached(LayerState),
}

impl AttachmentState {
  pub fn layer_state(&self) -> Option<&LayerState> {
    match self {
      AttachmentState::Unattached => None,
      AttachmentState::SourceStaged(state) | AttachmentState::Attached(state) => Some(state),
    }
  }

  pub fn url(&self) -> Option<&str> {
    self.layer_state().map(|s| s.url.as_str())
  }

  pub fn source_id(&self) -> Option<&str> {
    self.layer_state().map(|s| s.source_id.as_str())
  }

  pub fn is_attached(&self) -> bool {
    matches!(self, AttachmentState::Attached(_))
  }
}

/// Per-overlay attachment states, keyed by overlay id.
///
/// Unattached overlays are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentLedger {
  entries: BTreeMap<String, AttachmentState>,
}

impl AttachmentLedger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, id: &str) -> Option<&AttachmentState> {
    self.entries.get(id)
  }

  pub fn state(&self, id: &str) -> AttachmentState {
    self.entries.get(id).cloned().unwrap_or(AttachmentState::Unattached)
  }

  pub fn is_attached(&self, id: &str) -> bool {
    self.entries.get(id).is_some_and(AttachmentState::is_attached)
  }

  /// Ids of overlays whose layer is live, in id order.
  pub fn attached_ids(&self) -> impl Iterator<Item = &str> {
    self
      .entries
      .iter()
      .filter(|(_, state)| state.is_attached())
      .map(|(id, _)| id.as_str())
  }

  /// Ids of overlays with only a source registered.
  pub fn staged_ids(&self) -> impl Iterator<Item = &str> {
    self
      .entries
      .iter()
      .filter(|(_, state)| matches!(state, AttachmentState::SourceStaged(_)))
      .map(|(id, _)| id.as_str())
  }

  /// Snapshot of every tracked id.
  pub fn ids(&self) -> Vec<String> {
    self.entries.keys().cloned().collect()
  }

  pub fn attach(&mut self, id: impl Into<String>, source_id: impl Into<String>, url: impl Into<String>) {
    self.entries.insert(
      id.into(),
      AttachmentState::Attached(LayerState {
        source_id: source_id.into(),
        url: url.into(),
      }),
    );
  }

  pub fn stage(&mut self, id: impl Into<String>, source_id: impl Into<String>, url: impl Into<String>) {
    self.entries.insert(
      id.into(),
      AttachmentState::SourceStaged(LayerState {
        source_id: source_id.into(),
        url: url.into(),
      }),
    );
  }

  /// Drops an overlay from the ledger, returning its previous state.
  pub fn forget(&mut self, id: &str) -> Option<AttachmentState> {
    self.entries.remove(id)
  }
}
