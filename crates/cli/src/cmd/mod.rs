mod basemaps;
mod cache;
mod compose;
mod reconcile;
mod tile;

pub use basemaps::cmd_basemaps;
pub use cache::{cmd_cache_clear, cmd_cache_stats};
pub use compose::{ComposeArgs, cmd_compose};
pub use reconcile::cmd_reconcile;
pub use tile::cmd_tile;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use mapweave_lib::config::ProxyConfig;
use mapweave_lib::style::StyleDocument;

/// Reads and parses a style document.
fn read_style(path: &Path) -> Result<StyleDocument> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read style {}", path.display()))?;
  StyleDocument::from_json(&content).with_context(|| format!("Failed to parse style {}", path.display()))
}

/// Writes to a temp file next to `path`, then renames it into place.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;
  }
  let mut temp = path.as_os_str().to_owned();
  temp.push(".tmp");
  let temp = PathBuf::from(temp);
  fs::write(&temp, content).with_context(|| format!("Failed to write {}", temp.display()))?;
  fs::rename(&temp, path).with_context(|| format!("Failed to write {}", path.display()))
}

/// Proxy configuration from the environment with an optional cache directory override.
fn proxy_config(cache_dir: Option<PathBuf>) -> ProxyConfig {
  let config = ProxyConfig::from_env();
  match cache_dir {
    Some(dir) => config.with_cache_dir(dir),
    None => config,
  }
}
