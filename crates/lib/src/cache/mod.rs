//! Disk-backed response cache.
//!
//! # Storage Layout
//!
//! ```text
//! <directory>/
//! ├── <sha256(key)>.bin    response body
//! └── <sha256(key)>.json   entry metadata
//! ```
//!
//! # Example Metadata File
//!
//! ```json
//! {
//!   "key": "https://geo.so.ch/api/wms?SERVICE=WMS&...",
//!   "hash": "3f0a...",
//!   "created_at": 1718000000000,
//!   "last_accessed": 1718000042000,
//!   "size": 14231,
//!   "content_type": "image/png"
//! }
//! ```
//!
//! Reads and writes never fail from the caller's point of view: an entry that
//! cannot be read is a miss, and a write that fails is logged and dropped.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::util::hash::{KeyHash, hash_key};

const DATA_EXT: &str = "bin";
const META_EXT: &str = "json";
const TEMP_SUFFIX: &str = ".tmp";

/// Errors from cache maintenance. Lookups and stores swallow these.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("cache I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize cache metadata: {0}")]
  Serialize(#[source] serde_json::Error),
}

impl CacheError {
  fn io(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// Limits and location of a [`TileCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
  pub directory: PathBuf,
  /// Total body bytes kept after a store.
  pub max_bytes: u64,
  /// Entries older than this (since creation) are discarded.
  pub max_age: Duration,
}

/// A cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
  pub bytes: Vec<u8>,
  pub content_type: String,
}

/// Per-entry metadata. Times are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
  pub key: String,
  pub hash: KeyHash,
  pub created_at: u64,
  pub last_accessed: u64,
  pub size: u64,
  pub content_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
  pub entries: usize,
  pub total_bytes: u64,
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

/// Content-addressed cache of response bodies with an age limit and a byte
/// budget. Oldest-created entries are evicted first.
#[derive(Debug, Clone)]
pub struct TileCache {
  options: CacheOptions,
}

impl TileCache {
  pub fn new(options: CacheOptions) -> Self {
    Self { options }
  }

  pub fn options(&self) -> &CacheOptions {
    &self.options
  }

  pub fn directory(&self) -> &Path {
    &self.options.directory
  }

  fn entry_paths(&self, hash: &KeyHash) -> (PathBuf, PathBuf) {
    let base = self.options.directory.join(hash.as_str());
    (base.with_extension(DATA_EXT), base.with_extension(META_EXT))
  }

  fn is_expired(&self, meta: &CacheMeta, now: u64) -> bool {
    now.saturating_sub(meta.created_at) > self.options.max_age.as_millis() as u64
  }

  pub async fn get(&self, key: &str) -> Option<CacheHit> {
    self.get_at(key, now_ms()).await
  }

  /// Looks up `key` as of `now`.
  pub async fn get_at(&self, key: &str, now: u64) -> Option<CacheHit> {
    let hash = hash_key(key);
    let (data_path, meta_path) = self.entry_paths(&hash);

    let mut meta = read_meta(&meta_path).await?;

    if self.is_expired(&meta, now) {
      debug!(hash = %hash, "cache entry expired");
      self.delete_entry(&hash).await;
      return None;
    }

    let bytes = match fs::read(&data_path).await {
      Ok(bytes) => bytes,
      Err(e) => {
        debug!(hash = %hash, error = %e, "cache body unreadable, dropping entry");
        self.delete_entry(&hash).await;
        return None;
      }
    };

    meta.last_accessed = now;
    if let Err(e) = write_meta(&meta_path, &meta).await {
      warn!(hash = %hash, error = %e, "failed to update cache access time");
    }

    debug!(hash = %hash, size = bytes.len(), "cache hit");
    Some(CacheHit {
      bytes,
      content_type: meta.content_type,
    })
  }

  pub async fn set(&self, key: &str, bytes: &[u8], content_type: &str) {
    self.set_at(key, bytes, content_type, now_ms()).await
  }

  /// Stores `bytes` under `key` as of `now`, then prunes.
  pub async fn set_at(&self, key: &str, bytes: &[u8], content_type: &str, now: u64) {
    if let Err(e) = self.try_set(key, bytes, content_type, now).await {
      warn!(error = %e, "failed to write cache entry");
    }
  }

  async fn try_set(&self, key: &str, bytes: &[u8], content_type: &str, now: u64) -> Result<(), CacheError> {
    let dir = &self.options.directory;
    fs::create_dir_all(dir).await.map_err(CacheError::io(dir))?;

    let hash = hash_key(key);
    let (data_path, meta_path) = self.entry_paths(&hash);
    let meta = CacheMeta {
      key: key.to_string(),
      hash: hash.clone(),
      created_at: now,
      last_accessed: now,
      size: bytes.len() as u64,
      content_type: content_type.to_string(),
    };

    write_atomic(&data_path, bytes).await?;
    write_meta(&meta_path, &meta).await?;
    debug!(hash = %hash, size = meta.size, "cache entry stored");

    let removed = self.prune(now).await?;
    if removed > 0 {
      info!(removed, "pruned cache entries");
    }
    Ok(())
  }

  async fn delete_entry(&self, hash: &KeyHash) {
    let (data_path, meta_path) = self.entry_paths(hash);
    for path in [data_path, meta_path] {
      if let Err(e) = fs::remove_file(&path).await {
        if e.kind() != io::ErrorKind::NotFound {
          warn!(path = %path.display(), error = %e, "failed to remove cache file");
        }
      }
    }
  }

  /// Metadata of every readable entry. A missing directory has no entries.
  async fn all_metas(&self) -> Result<Vec<CacheMeta>, CacheError> {
    let dir = &self.options.directory;
    let mut read_dir = match fs::read_dir(dir).await {
      Ok(read_dir) => read_dir,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(CacheError::io(dir)(e)),
    };

    let mut metas = Vec::new();
    while let Some(entry) = read_dir.next_entry().await.map_err(CacheError::io(dir))? {
      let path = entry.path();
      if path.extension().and_then(|ext| ext.to_str()) != Some(META_EXT) {
        continue;
      }
      if let Some(meta) = read_meta(&path).await {
        metas.push(meta);
      }
    }
    Ok(metas)
  }

  /// Drops expired entries, then the oldest-created ones until the total size
  /// fits the byte budget. Returns how many entries were removed.
  async fn prune(&self, now: u64) -> Result<usize, CacheError> {
    let mut removed = 0;
    let mut fresh = Vec::new();
    for meta in self.all_metas().await? {
      if self.is_expired(&meta, now) {
        self.delete_entry(&meta.hash).await;
        removed += 1;
      } else {
        fresh.push(meta);
      }
    }

    let mut total: u64 = fresh.iter().map(|meta| meta.size).sum();
    if total <= self.options.max_bytes {
      return Ok(removed);
    }

    fresh.sort_by_key(|meta| meta.created_at);
    for meta in fresh {
      if total <= self.options.max_bytes {
        break;
      }
      debug!(hash = %meta.hash, size = meta.size, "evicting cache entry");
      self.delete_entry(&meta.hash).await;
      total = total.saturating_sub(meta.size);
      removed += 1;
    }
    Ok(removed)
  }

  pub async fn stats(&self) -> Result<CacheStats, CacheError> {
    let metas = self.all_metas().await?;
    Ok(CacheStats {
      entries: metas.len(),
      total_bytes: metas.iter().map(|meta| meta.size).sum(),
    })
  }

  /// Deletes every cache file. Returns the number of entries removed.
  pub async fn clear(&self) -> Result<usize, CacheError> {
    let metas = self.all_metas().await?;
    for meta in &metas {
      self.delete_entry(&meta.hash).await;
    }
    info!(entries = metas.len(), directory = %self.options.directory.display(), "cache cleared");
    Ok(metas.len())
  }
}

async fn read_meta(path: &Path) -> Option<CacheMeta> {
  let content = fs::read_to_string(path).await.ok()?;
  let meta: CacheMeta = serde_json::from_str(&content).ok()?;
  if meta.hash.as_str().is_empty() || meta.created_at == 0 {
    return None;
  }
  Some(meta)
}

async fn write_meta(path: &Path, meta: &CacheMeta) -> Result<(), CacheError> {
  let content = serde_json::to_vec(meta).map_err(CacheError::Serialize)?;
  write_atomic(path, &content).await
}

/// Writes to a temp file next to `path`, then renames it into place.
async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), CacheError> {
  let mut temp = path.as_os_str().to_owned();
  temp.push(TEMP_SUFFIX);
  let temp = PathBuf::from(temp);
  fs::write(&temp, content).await.map_err(CacheError::io(&temp))?;
  fs::rename(&temp, path).await.map_err(CacheError::io(path))
}
