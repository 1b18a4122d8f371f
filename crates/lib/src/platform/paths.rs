use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Returns the user's home directory, if it can be determined
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("USERPROFILE").map(PathBuf::from)
}

/// Returns the user's home directory, if it can be determined
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").map(PathBuf::from)
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  std::env::var_os("LOCALAPPDATA")
    .map(PathBuf::from)
    .or_else(home_dir)
    .unwrap_or_else(std::env::temp_dir)
    .join(APP_NAME)
    .join("Cache")
}

/// Returns the directory for cache files for the application
///
/// Falls back to the system temp directory when neither `XDG_CACHE_HOME` nor
/// `HOME` is set.
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  let cache_home = std::env::var_os("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .or_else(|| home_dir().map(|home| home.join(".cache")))
    .unwrap_or_else(std::env::temp_dir);
  cache_home.join(APP_NAME)
}

/// Default location of the tile cache
pub fn tile_cache_dir() -> PathBuf {
  cache_dir().join("tiles")
}
