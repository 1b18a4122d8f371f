//! Shared test helpers for CLI integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get a Command for the mapweave binary, isolated from the user's cache.
pub fn mapweave_cmd(temp: &TempDir) -> Command {
  let mut cmd = cargo_bin_cmd!("mapweave");
  cmd
    .env("MAPWEAVE_CACHE_DIR", temp.path().join("cache"))
    .env_remove("MAPWEAVE_PROXY_BASE_URL")
    .env_remove("RUST_LOG");
  cmd
}

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
  serde_json::from_slice(&output.stdout)
    .unwrap_or_else(|e| panic!("stdout is not JSON: {}\n{}", e, String::from_utf8_lossy(&output.stdout)))
}

/// Read a JSON file written by a command.
pub fn read_json(path: &std::path::Path) -> serde_json::Value {
  let content = std::fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
  serde_json::from_str(&content).unwrap()
}
