//! Overlay layers and their reconciliation against a live renderer.
//!
//! Callers describe the overlays they want as a list of [`OverlayLayer`]s. The
//! [`Reconciler`] compares that list with the [`AttachmentLedger`] and the
//! renderer's actual contents, then applies the minimal set of changes.

pub mod ledger;
pub mod metadata;
pub mod reconcile;
pub mod types;

pub use ledger::{AttachmentLedger, AttachmentState, LayerState};
pub use metadata::{TileMetadata, VectorLayerInfo};
pub use reconcile::{LayerSummary, ReconcileFailure, ReconcileReport, Reconciler, layer_order};
pub use types::{LayerRole, LayerType, OverlayLayer, SourceKind, default_source_id};
