use std::path::PathBuf;

use anyhow::{Context, Result};

use mapweave_lib::cache::TileCache;

use super::proxy_config;
use crate::output::{format_bytes, print_json, print_stat, print_success};

pub fn cmd_cache_stats(cache_dir: Option<PathBuf>, json: bool) -> Result<()> {
  let config = proxy_config(cache_dir);
  let cache = TileCache::new(config.cache);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let stats = rt.block_on(cache.stats()).context("Failed to read cache")?;
  let options = cache.options();

  if json {
    print_json(&serde_json::json!({
      "directory": options.directory,
      "entries": stats.entries,
      "total_bytes": stats.total_bytes,
      "max_bytes": options.max_bytes,
      "max_age_ms": options.max_age.as_millis() as u64,
    }))?;
  } else {
    print_success(&format!("Tile cache at {}", options.directory.display()));
    print_stat("Entries", &stats.entries.to_string());
    print_stat(
      "Size",
      &format!("{} of {}", format_bytes(stats.total_bytes), format_bytes(options.max_bytes)),
    );
    print_stat("Max age", &humantime::format_duration(options.max_age).to_string());
  }

  Ok(())
}

pub fn cmd_cache_clear(cache_dir: Option<PathBuf>, json: bool) -> Result<()> {
  let config = proxy_config(cache_dir);
  let cache = TileCache::new(config.cache);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let removed = rt.block_on(cache.clear()).context("Failed to clear cache")?;

  if json {
    print_json(&serde_json::json!({ "removed": removed }))?;
  } else {
    print_success(&format!("Removed {} cache entries", removed));
  }

  Ok(())
}
