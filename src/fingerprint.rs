//! Content fingerprinting for change detection
//!
//! Documents are fingerprinted over the exact bytes fetched from the wire,
//! before any text decoding. The fingerprint is what decides whether a
//! refetch rewrites the stored body or only touches its timestamp.

use sha2::{Digest, Sha256};

/// Computes a hex-encoded SHA-256 digest of the given bytes.
///
/// Deterministic across runs; no side effects.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Returns true if the content behind the two fingerprints differs.
pub fn has_changed(existing_hash: &str, new_hash: &str) -> bool {
    existing_hash != new_hash
}
