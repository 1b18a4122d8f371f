use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use mapweave_lib::proxy::TileProxy;

use super::{proxy_config, write_atomic};
use crate::output::{format_bytes, print_stat, print_success};

pub fn cmd_tile(query: &str, output: Option<&Path>, base_url: Option<&str>, cache_dir: Option<PathBuf>) -> Result<()> {
  let mut config = proxy_config(cache_dir);
  if let Some(url) = base_url {
    config = config.with_base_url(url)?;
  }
  let proxy = TileProxy::new(config);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let response = rt.block_on(proxy.fetch(query)).context("Tile request failed")?;

  match output {
    Some(path) => {
      write_atomic(path, &response.body)?;
      print_success(&format!("Tile written to {}", path.display()));
      print_stat("Content type", response.content_type.as_deref().unwrap_or("unknown"));
      print_stat("Size", &format_bytes(response.body.len() as u64));
      print_stat("Cache", &format!("{:?}", response.cache_status).to_lowercase());
      print_stat("Cache-Control", response.cache_control);
    }
    None => {
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(&response.body).context("Failed to write tile to stdout")?;
      stdout.flush()?;
    }
  }

  Ok(())
}
