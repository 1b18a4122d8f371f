//! Implementation of the `mapweave compose` command.
//!
//! Each basemap or style file is namespaced and merged in command-line order:
//! built-in basemaps first, then style files. Later entries paint on top.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use mapweave_lib::basemap::{BasemapComposer, BasemapStyle, find, load_style};
use mapweave_lib::style::{ReferenceIssue, StyleDocument, normalise_style};

use super::{read_style, write_atomic};
use crate::output::{print_stat, print_success, print_warning};

pub struct ComposeArgs {
  pub basemaps: Vec<String>,
  pub styles: Vec<String>,
  pub hidden: Vec<String>,
  pub base_url: Option<String>,
  pub output: Option<PathBuf>,
}

/// Splits a `NS=PATH` argument.
fn parse_style_arg(arg: &str) -> Result<(String, PathBuf)> {
  match arg.split_once('=') {
    Some((namespace, path)) if !namespace.trim().is_empty() && !path.is_empty() => {
      Ok((namespace.trim().to_string(), PathBuf::from(path)))
    }
    _ => bail!("Invalid --style '{}', expected NS=PATH", arg),
  }
}

pub fn cmd_compose(args: ComposeArgs) -> Result<()> {
  if args.basemaps.is_empty() && args.styles.is_empty() {
    bail!("Nothing to compose, pass --basemap or --style");
  }

  let base_url = args.base_url.as_deref();
  let mut inputs: Vec<(String, StyleDocument)> = Vec::new();

  let basemaps = args
    .basemaps
    .iter()
    .map(|id| find(id))
    .collect::<Result<Vec<_>, _>>()?;

  if !basemaps.is_empty() {
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    for basemap in &basemaps {
      let style = rt
        .block_on(load_style(basemap))
        .with_context(|| format!("Failed to load basemap '{}'", basemap.id))?;
      // remote styles are already anchored at their own URL
      let style = match basemap.style {
        BasemapStyle::Inline(_) => normalise_style(&style, base_url),
        BasemapStyle::Remote(_) => style,
      };
      inputs.push((basemap.id.to_string(), style));
    }
  }

  for arg in &args.styles {
    let (namespace, path) = parse_style_arg(arg)?;
    let style = read_style(&path)?;
    inputs.push((namespace, normalise_style(&style, base_url)));
  }

  let hidden: HashSet<&str> = args.hidden.iter().map(String::as_str).collect();
  let mut composer = BasemapComposer::new();
  for (namespace, style) in &inputs {
    composer
      .apply(namespace, style, !hidden.contains(namespace.as_str()))
      .with_context(|| format!("Failed to compose namespace '{}'", namespace))?;
  }

  for namespace in &hidden {
    if composer.footprint(namespace).is_none() {
      print_warning(&format!("--hidden {} does not match any composed namespace", namespace));
    }
  }

  let composed = composer.into_composed();
  for issue in composed.reference_issues() {
    print_warning(&describe_issue(&issue));
  }

  let json = composed.to_json_pretty().context("Failed to serialize composed style")?;
  match &args.output {
    Some(path) => {
      write_atomic(path, json.as_bytes())?;
      info!(path = %path.display(), "composed style written");
      report(path, &composed);
    }
    None => println!("{}", json),
  }

  Ok(())
}

fn report(path: &Path, composed: &StyleDocument) {
  print_success(&format!("Composed style written to {}", path.display()));
  print_stat("Sources", &composed.sources.len().to_string());
  print_stat("Layers", &composed.layers.len().to_string());
}

fn describe_issue(issue: &ReferenceIssue) -> String {
  match issue {
    ReferenceIssue::MissingSource { layer, source } => {
      format!("Layer '{}' references missing source '{}'", layer, source)
    }
    ReferenceIssue::MissingRef { layer, target } => {
      format!("Layer '{}' references missing layer '{}'", layer, target)
    }
    ReferenceIssue::DuplicateLayer { layer } => format!("Layer '{}' appears more than once", layer),
  }
}
