//! Hashing for content-addressed cache entries.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Full 64-character lowercase hex SHA-256 of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyHash(pub String);

impl KeyHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for KeyHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub fn hash_bytes(data: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(data);
  hex::encode(hasher.finalize())
}

/// Hashes a cache key into a file-system safe name.
pub fn hash_key(key: &str) -> KeyHash {
  KeyHash(hash_bytes(key.as_bytes()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_digest() {
    assert_eq!(
      hash_key("abc").0,
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn distinct_keys_distinct_hashes() {
    let a = hash_key("SERVICE=WMS&BBOX=0,0,1,1");
    let b = hash_key("SERVICE=WMS&BBOX=0,0,1,2");
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 64);
    assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
  }
}
