mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::output::print_error;

/// mapweave - compose basemap styles and reconcile overlay layers
#[derive(Parser)]
#[command(name = "mapweave")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List the built-in basemaps
  Basemaps {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Build a composed style document from basemaps and style files
  Compose {
    /// Built-in basemap to include, namespaced under its id (repeatable)
    #[arg(long = "basemap", value_name = "ID")]
    basemaps: Vec<String>,

    /// Style file to include under a namespace (repeatable)
    #[arg(long = "style", value_name = "NS=PATH")]
    styles: Vec<String>,

    /// Namespace to include hidden (repeatable)
    #[arg(long = "hidden", value_name = "NS")]
    hidden: Vec<String>,

    /// URL that relative references in local styles are resolved against
    #[arg(long)]
    base_url: Option<String>,

    /// Write the composed style here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Reconcile overlay layers against a style
  Reconcile {
    /// Style document the overlays are applied to
    #[arg(long)]
    style: PathBuf,

    /// Overlay list (JSON, or YAML by .yaml/.yml extension)
    #[arg(long)]
    overlays: PathBuf,

    /// Attachment ledger, read if present and written afterwards
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Write the resulting style here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
  },

  /// Fetch a tile through the caching proxy
  Tile {
    /// Query string sent to the upstream service
    query: String,

    /// Write the tile here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Upstream service URL (overrides MAPWEAVE_PROXY_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Cache directory (overrides MAPWEAVE_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
  },

  /// Inspect or clear the tile cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,

    /// Cache directory (overrides MAPWEAVE_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
  },
}

#[derive(Subcommand)]
enum CacheAction {
  /// Show entry count and size
  Stats {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Delete every cached tile
  Clear {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
  let filter = EnvFilter::builder()
    .with_default_directive(default_level.into())
    .from_env_lossy();

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result: Result<()> = match cli.command {
    Commands::Basemaps { json } => cmd::cmd_basemaps(json),
    Commands::Compose {
      basemaps,
      styles,
      hidden,
      base_url,
      output,
    } => cmd::cmd_compose(cmd::ComposeArgs {
      basemaps,
      styles,
      hidden,
      base_url,
      output,
    }),
    Commands::Reconcile {
      style,
      overlays,
      ledger,
      output,
      json,
    } => cmd::cmd_reconcile(&style, &overlays, ledger.as_deref(), output.as_deref(), json),
    Commands::Tile {
      query,
      output,
      base_url,
      cache_dir,
    } => cmd::cmd_tile(&query, output.as_deref(), base_url.as_deref(), cache_dir),
    Commands::Cache { action, cache_dir } => match action {
      CacheAction::Stats { json } => cmd::cmd_cache_stats(cache_dir, json),
      CacheAction::Clear { json } => cmd::cmd_cache_clear(cache_dir, json),
    },
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
