//! SHA-256 digests and secret comparison.
//!
//! Callback tokens are stored only as digests, and shared secrets are
//! compared without short-circuiting on the first differing byte.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Compare two secrets in time independent of where they differ.
///
/// Both sides are hashed first so the comparison length is fixed and the
/// length of the expected secret does not leak.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
