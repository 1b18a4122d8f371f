use anyhow::Result;

use mapweave_lib::basemap::{BasemapStyle, catalog};

use crate::output::{print_info, print_json, print_stat};

pub fn cmd_basemaps(json: bool) -> Result<()> {
  let basemaps = catalog();

  if json {
    let items: Vec<_> = basemaps
      .iter()
      .map(|b| {
        let (kind, style_url) = match &b.style {
          BasemapStyle::Inline(_) => ("inline", None),
          BasemapStyle::Remote(url) => ("remote", Some(url.as_str())),
        };
        serde_json::json!({
          "id": b.id,
          "label": b.label,
          "description": b.description,
          "style": kind,
          "style_url": style_url,
        })
      })
      .collect();
    return print_json(&items);
  }

  for basemap in &basemaps {
    print_info(&format!("{} - {}", basemap.id, basemap.label));
    print_stat("Description", &basemap.description);
    match &basemap.style {
      BasemapStyle::Inline(style) => print_stat(
        "Style",
        &format!("inline ({} sources, {} layers)", style.sources.len(), style.layers.len()),
      ),
      BasemapStyle::Remote(url) => print_stat("Style", url),
    }
  }

  Ok(())
}
