//! Content fingerprint used as the result cache key
//!
//! The digest covers the analyzed text and the analysis scheme id. The text
//! length is hashed first so that no `(text, scheme)` pair can produce the same
//! byte stream as another pair.

use sha2::{Digest, Sha256};

/// Compute the cache fingerprint for `text` analyzed under `scheme`
///
/// Returns 64 lowercase hex characters (SHA-256).
///
/// # Examples
///
/// ```
/// use rhyme_common::fingerprint;
///
/// let a = fingerprint("roses are red", "default");
/// assert_eq!(a, fingerprint("roses are red", "default"));
/// assert_ne!(a, fingerprint("roses are red", "slant"));
/// assert_eq!(a.len(), 64);
/// ```
pub fn fingerprint(text: &str, scheme: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    hasher.update(scheme.as_bytes());
    format!("{:x}", hasher.finalize())
}
