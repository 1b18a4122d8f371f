//! Style documents and their composition.
//!
//! A basemap style goes through three steps before it reaches the renderer:
//! 1. [`normalise_style`] anchors relative resource URLs at the style's origin
//! 2. [`namespace_style`] prefixes ids so the style can share a renderer
//! 3. [`merge`] appends the namespaced bundle to the composed document

pub mod compose;
pub mod namespace;
pub mod resolve;
pub mod types;

pub use compose::{BundleFootprint, ComposeError, collect_layer_ids, merge, retract};
pub use namespace::{NamespaceOptions, NamespacedBundle, namespace_style, namespaced_id};
pub use resolve::{is_absolute_url, normalise_style, resolve_url};
pub use types::{LayerDef, PropertyMap, ReferenceIssue, SourceDef, SourceMap, Sprite, StyleDocument, StyleError, Visibility};
