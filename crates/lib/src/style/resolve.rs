//! URL resolution for style documents.
//!
//! Style documents fetched from a remote location often reference their
//! sprite, glyphs and tile endpoints relative to the document itself. Once the
//! document is merged into a composed style those references would resolve
//! against the wrong origin, so they are anchored here first.

use reqwest::Url;
use tracing::warn;

use super::types::{Sprite, StyleDocument};

/// Returns true for `scheme:` and protocol-relative (`//host`) references.
pub fn is_absolute_url(value: &str) -> bool {
  if value.starts_with("//") {
    return true;
  }

  let mut chars = value.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() => {}
    _ => return false,
  }

  for c in chars {
    match c {
      ':' => return true,
      c if c.is_ascii_alphanumeric() || c == '+' || c == '.' || c == '-' => {}
      _ => return false,
    }
  }

  false
}

/// Restores `{` and `}` that the URL serializer percent-encoded.
///
/// Tile templates such as `{z}/{x}/{y}` or `{fontstack}` must stay literal.
fn restore_template_braces(value: &str) -> String {
  value
    .replace("%7B", "{")
    .replace("%7b", "{")
    .replace("%7D", "}")
    .replace("%7d", "}")
}

/// Resolves `value` against `base`.
///
/// Absolute references, `data:` URIs, empty values and calls without a base
/// are returned unchanged. A base that cannot be parsed is logged and the
/// original value is returned.
pub fn resolve_url(value: &str, base: Option<&str>) -> String {
  let base = match base {
    Some(base) if !value.is_empty() => base,
    _ => return value.to_string(),
  };

  if is_absolute_url(value) || value.starts_with("data:") {
    return value.to_string();
  }

  match Url::parse(base).and_then(|base_url| base_url.join(value)) {
    Ok(resolved) => restore_template_braces(resolved.as_str()),
    Err(e) => {
      warn!(value = %value, base = %base, error = %e, "failed to resolve relative URL");
      value.to_string()
    }
  }
}

/// Returns a copy of `style` with every resource reference anchored at
/// `style_url`: sprite, glyphs, and each source's `url` and `tiles`.
///
/// The input document is never modified.
pub fn normalise_style(style: &StyleDocument, style_url: Option<&str>) -> StyleDocument {
  let mut doc = style.clone();

  doc.sprite = doc.sprite.map(|sprite| match sprite {
    Sprite::Url(url) => Sprite::Url(resolve_url(&url, style_url)),
    Sprite::Sheets(mut sheets) => {
      for sheet in &mut sheets {
        sheet.url = resolve_url(&sheet.url, style_url);
      }
      Sprite::Sheets(sheets)
    }
  });

  doc.glyphs = doc.glyphs.map(|glyphs| resolve_url(&glyphs, style_url));

  for (_, source) in doc.sources.iter_mut() {
    if let Some(url) = &source.url {
      source.url = Some(resolve_url(url, style_url));
    }
    if let Some(tiles) = &mut source.tiles {
      for tile in tiles.iter_mut() {
        *tile = resolve_url(tile, style_url);
      }
    }
  }

  doc
}
