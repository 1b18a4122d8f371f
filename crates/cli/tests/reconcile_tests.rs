//! Integration tests for `mapweave reconcile`.

mod common;

use predicates::prelude::*;
use tempfile::TempDir;

use common::{fixture_path, mapweave_cmd, read_json, stdout_json};

fn ids(value: &serde_json::Value) -> Vec<&str> {
  value
    .as_array()
    .unwrap()
    .iter()
    .map(|v| v.as_str().unwrap())
    .collect()
}

#[test]
fn reconcile_adds_overlays_and_defers_missing_source_layer() {
  let temp = TempDir::new().unwrap();
  let output = mapweave_cmd(&temp)
    .args(["reconcile", "--json", "--style"])
    .arg(fixture_path("style.json"))
    .arg("--overlays")
    .arg(fixture_path("overlays.json"))
    .output()
    .unwrap();
  assert!(output.status.success());

  let report = stdout_json(&output);
  assert_eq!(ids(&report["layers_added"]), vec!["d1"]);
  assert_eq!(ids(&report["deferred"]), vec!["pending"]);
  assert_eq!(ids(&report["sources_added"]), vec!["d1-source", "pending-source"]);
  assert!(report["removed"].as_array().unwrap().is_empty());

  let order: Vec<&str> = report["layer_order"]
    .as_array()
    .unwrap()
    .iter()
    .map(|l| l["id"].as_str().unwrap())
    .collect();
  assert_eq!(order, vec!["base::water", "d1"]);
}

#[test]
fn reconcile_writes_style_with_pmtiles_sources() {
  let temp = TempDir::new().unwrap();
  let out = temp.path().join("reconciled.json");

  mapweave_cmd(&temp)
    .args(["reconcile", "--style"])
    .arg(fixture_path("style.json"))
    .arg("--overlays")
    .arg(fixture_path("overlays.json"))
    .arg("-o")
    .arg(&out)
    .assert()
    .success()
    .stdout(predicate::str::contains("Reconciliation complete"))
    .stdout(predicate::str::contains("d1"));

  let style = read_json(&out);
  assert_eq!(style["sources"]["d1-source"]["url"], "pmtiles://https://x/a.pmtiles");
  assert_eq!(style["sources"]["pending-source"]["url"], "pmtiles://https://x/p.pmtiles");
  assert!(style["sources"]["base::tiles"].is_object());

  let d1 = &style["layers"][1];
  assert_eq!(d1["id"], "d1");
  assert_eq!(d1["source"], "d1-source");
  assert_eq!(d1["source-layer"], "land");
  assert_eq!(d1["paint"]["fill-color"], "#3366ff");
}

#[test]
fn reconcile_second_pass_is_idempotent() {
  let temp = TempDir::new().unwrap();
  let ledger = temp.path().join("ledger.json");
  let first = temp.path().join("first.json");
  let second = temp.path().join("second.json");

  mapweave_cmd(&temp)
    .args(["reconcile", "--style"])
    .arg(fixture_path("style.json"))
    .arg("--overlays")
    .arg(fixture_path("overlays.json"))
    .arg("--ledger")
    .arg(&ledger)
    .arg("-o")
    .arg(&first)
    .assert()
    .success();

  let saved = read_json(&ledger);
  assert_eq!(saved["d1"]["state"], "attached");
  assert_eq!(saved["d1"]["url"], "https://x/a.pmtiles");
  assert_eq!(saved["pending"]["state"], "source_staged");

  let output = mapweave_cmd(&temp)
    .args(["reconcile", "--json", "--style"])
    .arg(&first)
    .arg("--overlays")
    .arg(fixture_path("overlays.json"))
    .arg("--ledger")
    .arg(&ledger)
    .arg("-o")
    .arg(&second)
    .output()
    .unwrap();
  assert!(output.status.success());

  let report = stdout_json(&output);
  assert!(report["layers_added"].as_array().unwrap().is_empty());
  assert!(report["sources_added"].as_array().unwrap().is_empty());
  assert!(report["removed"].as_array().unwrap().is_empty());
  assert_eq!(ids(&report["updated"]), vec!["d1"]);
  assert_eq!(ids(&report["deferred"]), vec!["pending"]);

  assert_eq!(read_json(&first), read_json(&second));
}

#[test]
fn reconcile_removes_overlays_dropped_from_the_list() {
  let temp = TempDir::new().unwrap();
  let ledger = temp.path().join("ledger.json");
  let first = temp.path().join("first.json");
  let empty = temp.path().join("empty.json");
  std::fs::write(&empty, "[]").unwrap();

  mapweave_cmd(&temp)
    .args(["reconcile", "--style"])
    .arg(fixture_path("style.json"))
    .arg("--overlays")
    .arg(fixture_path("overlays.json"))
    .arg("--ledger")
    .arg(&ledger)
    .arg("-o")
    .arg(&first)
    .assert()
    .success();

  let output = mapweave_cmd(&temp)
    .args(["reconcile", "--json", "--style"])
    .arg(&first)
    .arg("--overlays")
    .arg(&empty)
    .arg("--ledger")
    .arg(&ledger)
    .output()
    .unwrap();
  assert!(output.status.success());

  let report = stdout_json(&output);
  let mut removed = ids(&report["removed"]);
  removed.sort_unstable();
  assert_eq!(removed, vec!["d1", "pending"]);
  assert_eq!(report["layer_order"].as_array().unwrap().len(), 1);

  let saved = read_json(&ledger);
  assert!(saved.as_object().unwrap().is_empty());
}

#[test]
fn reconcile_reads_yaml_overlays() {
  let temp = TempDir::new().unwrap();
  let out = temp.path().join("reconciled.json");

  let output = mapweave_cmd(&temp)
    .args(["reconcile", "--json", "--style"])
    .arg(fixture_path("style.json"))
    .arg("--overlays")
    .arg(fixture_path("overlays.yaml"))
    .arg("-o")
    .arg(&out)
    .output()
    .unwrap();
  assert!(output.status.success());

  let report = stdout_json(&output);
  assert_eq!(ids(&report["layers_added"]), vec!["relief"]);

  let style = read_json(&out);
  assert_eq!(style["sources"]["relief-source"]["type"], "raster");
  assert_eq!(style["layers"][1]["type"], "raster");
  assert_eq!(style["layers"][1]["metadata"]["mapweave:layer-role"], "background");
}

#[test]
fn reconcile_missing_style_fails() {
  let temp = TempDir::new().unwrap();
  mapweave_cmd(&temp)
    .args(["reconcile", "--style"])
    .arg(temp.path().join("nope.json"))
    .arg("--overlays")
    .arg(fixture_path("overlays.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("nope.json"));
}
