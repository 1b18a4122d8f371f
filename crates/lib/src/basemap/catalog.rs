//! Built-in basemap catalog.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::style::{LayerDef, PropertyMap, SourceDef, StyleDocument};

use super::BasemapError;

const SWISSTOPO_STYLE_URL: &str =
  "https://vectortiles.geo.admin.ch/styles/ch.swisstopo.basemap.vt/style.json?key=xmETqTBaiAH9bbZXXiFm";

const HINTERGRUNDKARTE_TILES: &str = "/api/wms?SERVICE=WMS&REQUEST=GetMap&VERSION=1.3.0&FORMAT=image/png&TRANSPARENT=true&LAYERS=ch.so.agi.hintergrundkarte_sw&STYLES=&CRS=EPSG:3857&WIDTH=256&HEIGHT=256&DPI=96&OPACITIES=255&BBOX={bbox-epsg-3857}";

const OSM_TILES: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BasemapId {
  Swisstopo,
  Hintergrundkarte,
  Osm,
  Empty,
}

impl BasemapId {
  /// Catalog order.
  pub const ALL: [BasemapId; 4] = [
    BasemapId::Swisstopo,
    BasemapId::Hintergrundkarte,
    BasemapId::Osm,
    BasemapId::Empty,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      BasemapId::Swisstopo => "swisstopo",
      BasemapId::Hintergrundkarte => "hintergrundkarte",
      BasemapId::Osm => "osm",
      BasemapId::Empty => "empty",
    }
  }
}

impl fmt::Display for BasemapId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BasemapId {
  type Err = BasemapError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    BasemapId::ALL
      .into_iter()
      .find(|id| id.as_str() == s)
      .ok_or_else(|| BasemapError::Unknown(s.to_string()))
  }
}

/// Where a basemap's style document comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "style", rename_all = "lowercase")]
pub enum BasemapStyle {
  Inline(StyleDocument),
  /// Fetched on demand, see [`load_style`](super::load_style).
  Remote(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasemapConfig {
  pub id: BasemapId,
  pub label: String,
  pub description: String,
  pub style: BasemapStyle,
}

/// A single raster source plus a full-zoom raster layer drawing it.
fn raster_style(name: &str, source_id: &str, tiles: &str, attribution: &str) -> StyleDocument {
  let mut source = SourceDef::with_tiles("raster", vec![tiles.to_string()]);
  source.extra.insert("tileSize".to_string(), Value::from(256));
  source.extra.insert("attribution".to_string(), Value::from(attribution));

  let mut layer = LayerDef::new(format!("{}-basemap", source_id), "raster").with_source(source_id);
  layer.minzoom = Some(0.0);
  layer.maxzoom = Some(19.0);

  let mut style = StyleDocument::named(name);
  style.sources.insert(source_id, source);
  style.layers.push(layer);
  style
}

fn empty_style() -> StyleDocument {
  let mut paint = PropertyMap::new();
  paint.insert("background-color".to_string(), Value::from("#ffffff"));

  let mut layer = LayerDef::new("empty-background", "background");
  layer.paint = Some(paint);

  let mut style = StyleDocument::named("No background");
  style.layers.push(layer);
  style
}

fn config(id: BasemapId) -> BasemapConfig {
  let (label, description, style) = match id {
    BasemapId::Swisstopo => (
      "swisstopo Vector Basemap",
      "Official Swiss vector basemap provided by swisstopo.",
      BasemapStyle::Remote(SWISSTOPO_STYLE_URL.to_string()),
    ),
    BasemapId::Hintergrundkarte => (
      "Hintergrundkarte schwarz/weiss",
      "Black and white background map provided by geo.so.ch.",
      BasemapStyle::Inline(raster_style(
        "Hintergrundkarte schwarz/weiss",
        "hintergrundkarte",
        HINTERGRUNDKARTE_TILES,
        "© Amt für Geoinformation Kanton Solothurn",
      )),
    ),
    BasemapId::Osm => (
      "OpenStreetMap",
      "Community driven basemap sourced from openstreetmap.org tiles.",
      BasemapStyle::Inline(raster_style(
        "OpenStreetMap",
        "osm",
        OSM_TILES,
        "© OpenStreetMap contributors",
      )),
    ),
    BasemapId::Empty => (
      "No background",
      "A blank white background suitable for focusing on overlay data.",
      BasemapStyle::Inline(empty_style()),
    ),
  };

  BasemapConfig {
    id,
    label: label.to_string(),
    description: description.to_string(),
    style,
  }
}

/// Every built-in basemap, in display order.
pub fn catalog() -> Vec<BasemapConfig> {
  BasemapId::ALL.into_iter().map(config).collect()
}

/// Looks up a basemap by its id string.
pub fn find(id: &str) -> Result<BasemapConfig, BasemapError> {
  id.parse().map(config)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn catalog_order_and_ids() {
    let ids: Vec<&str> = catalog().iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["swisstopo", "hintergrundkarte", "osm", "empty"]);
  }

  #[test]
  fn swisstopo_is_remote() {
    let swisstopo = find("swisstopo").unwrap();
    match swisstopo.style {
      BasemapStyle::Remote(url) => assert!(url.starts_with("https://vectortiles.geo.admin.ch/")),
      other => panic!("expected remote style, got {:?}", other),
    }
  }

  #[test]
  fn osm_has_single_raster_layer() {
    let BasemapStyle::Inline(style) = find("osm").unwrap().style else {
      panic!("osm should be inline");
    };
    let source = style.sources.get("osm").unwrap();
    assert_eq!(source.kind, "raster");
    assert_eq!(source.tiles.as_ref().unwrap()[0], OSM_TILES);
    assert_eq!(source.extra["tileSize"], 256);

    let layer = style.layer("osm-basemap").unwrap();
    assert_eq!(layer.source.as_deref(), Some("osm"));
    assert_eq!(layer.maxzoom, Some(19.0));
    assert!(style.reference_issues().is_empty());
  }

  #[test]
  fn hintergrundkarte_uses_proxy_template() {
    let BasemapStyle::Inline(style) = find("hintergrundkarte").unwrap().style else {
      panic!("hintergrundkarte should be inline");
    };
    let tiles = style.sources.get("hintergrundkarte").unwrap().tiles.clone().unwrap();
    assert!(tiles[0].starts_with("/api/wms?"));
    assert!(tiles[0].ends_with("BBOX={bbox-epsg-3857}"));
  }

  #[test]
  fn empty_is_white_background() {
    let BasemapStyle::Inline(style) = find("empty").unwrap().style else {
      panic!("empty should be inline");
    };
    assert!(style.sources.is_empty());
    let layer = style.layer("empty-background").unwrap();
    assert_eq!(layer.paint.as_ref().unwrap()["background-color"], "#ffffff");
  }

  #[test]
  fn unknown_id_is_an_error() {
    let err = find("satellite").unwrap_err();
    assert!(matches!(err, BasemapError::Unknown(ref id) if id == "satellite"));
  }
}
