/// Application name, used for platform directories.
pub const APP_NAME: &str = "mapweave";

/// Separator between a namespace token and the original identifier.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Scheme token prefixed onto overlay data URLs when registering sources.
pub const TILE_ARCHIVE_SCHEME: &str = "pmtiles://";

/// Metadata key carrying a layer's role (basemap, foreground, ...).
pub const META_LAYER_ROLE: &str = "mapweave:layer-role";

/// Metadata key carrying the basemap a namespaced layer came from.
pub const META_BASEMAP_ID: &str = "mapweave:basemap-id";

/// Metadata key carrying a human readable layer name.
pub const META_NAME: &str = "name";
