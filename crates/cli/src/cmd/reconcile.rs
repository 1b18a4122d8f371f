//! Implementation of the `mapweave reconcile` command.
//!
//! Loads a style into an in-memory renderer, waits for it to report ready,
//! reconciles the overlay list against it and prints what changed.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use mapweave_lib::overlay::{AttachmentLedger, OverlayLayer, ReconcileReport, Reconciler};
use mapweave_lib::ready::{ReadyOptions, schedule_ready};
use mapweave_lib::surface::{MapSurface, MemorySurface};

use super::{read_style, write_atomic};
use crate::output::{
  format_duration, print_change, print_info, print_json, print_stat, print_success, print_warning, symbols,
};

fn load_overlays(path: &Path) -> Result<Vec<OverlayLayer>> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read overlays {}", path.display()))?;
  let is_yaml = matches!(path.extension().and_then(|ext| ext.to_str()), Some("yaml" | "yml"));
  if is_yaml {
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse overlays {}", path.display()))
  } else {
    serde_json::from_str(&content).with_context(|| format!("Failed to parse overlays {}", path.display()))
  }
}

/// Loads a ledger, or starts an empty one if the file does not exist yet.
fn load_ledger(path: &Path) -> Result<AttachmentLedger> {
  if !path.exists() {
    return Ok(AttachmentLedger::new());
  }
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read ledger {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("Failed to parse ledger {}", path.display()))
}

pub fn cmd_reconcile(
  style_path: &Path,
  overlays_path: &Path,
  ledger_path: Option<&Path>,
  output: Option<&Path>,
  json: bool,
) -> Result<()> {
  let start = Instant::now();

  let mut surface = MemorySurface::new(read_style(style_path)?);
  let overlays = load_overlays(overlays_path)?;
  let mut ledger = match ledger_path {
    Some(path) => load_ledger(path)?,
    None => AttachmentLedger::new(),
  };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt.block_on(schedule_ready(&surface, &ReadyOptions::default(), || {
    debug!("renderer ready");
  }));
  debug!(outcome = ?outcome, "readiness resolved");

  let report = Reconciler::new().reconcile(&mut surface, &mut ledger, &overlays);

  if let Some(path) = ledger_path {
    let content = serde_json::to_vec_pretty(&ledger).context("Failed to serialize ledger")?;
    write_atomic(path, &content)?;
  }

  if let Some(path) = output {
    let content = surface.style().to_json_pretty().context("Failed to serialize style")?;
    write_atomic(path, content.as_bytes())?;
  }

  if json {
    print_json(&report)?;
  } else {
    print_report(&report);
    print_stat("Ledger entries", &ledger.len().to_string());
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  for failure in &report.failed {
    print_warning(&format!("{}: {}", failure.id, failure.error));
  }

  Ok(())
}

fn print_report(report: &ReconcileReport) {
  if report.is_noop() && report.deferred.is_empty() && report.failed.is_empty() {
    print_info("No structural changes");
  } else {
    print_success("Reconciliation complete!");
  }

  for id in &report.removed {
    print_change(symbols::REMOVE, id, "removed");
  }
  for id in &report.reloaded {
    print_change(symbols::MODIFY, id, "reloaded (url changed)");
  }
  for id in &report.layers_added {
    print_change(symbols::ADD, id, "layer added");
  }
  for id in &report.deferred {
    print_change(symbols::PENDING, id, "source staged, waiting for source layer");
  }

  println!();
  print_stat("Sources added", &report.sources_added.len().to_string());
  print_stat("Layers added", &report.layers_added.len().to_string());
  print_stat("Layers updated", &report.updated.len().to_string());
  print_stat("Layers total", &report.layer_order.len().to_string());
}
