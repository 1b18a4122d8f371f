//! mapweave-lib: map composition and reconciliation engine
//!
//! This crate provides the pieces needed to drive a map renderer from
//! independently authored style documents:
//! - `style`: style document model, URL resolution, namespacing and composition
//! - `basemap`: built-in basemaps and per-namespace composition bookkeeping
//! - `overlay`: overlay descriptors, the attachment ledger and the reconciler
//! - `surface`: the renderer collaborator trait and an in-memory renderer
//! - `ready`: deferring work until the renderer's style has loaded
//! - `cache` / `proxy`: disk-backed cache in front of a remote tile service

pub mod basemap;
pub mod cache;
pub mod config;
pub mod consts;
pub mod overlay;
pub mod platform;
pub mod proxy;
pub mod ready;
pub mod style;
pub mod surface;
pub mod util;
