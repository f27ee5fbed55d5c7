//! Content hashing for emitted artifacts.
//!
//! Artifacts are identified by the full SHA-256 of their bytes, which makes
//! reproducibility checks a plain string comparison.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash of some content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// The first 12 characters, for display.
  pub fn short(&self) -> &str {
    let len = self.0.len().min(12);
    &self.0[..len]
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash arbitrary bytes.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  ContentHash(hex::encode(hasher.finalize()))
}
