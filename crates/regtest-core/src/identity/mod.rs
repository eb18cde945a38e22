//! Content-addressed identity of cases

mod canonical;
mod registry;

pub use canonical::{
    Canonical,
    Canonicalize,
    record,
};
pub use registry::IdentityRegistry;

use crate::error::CanonicalError;
use sha2::{
    Digest,
    Sha256,
};

/// Hex characters kept from the digest of a case
pub const FINGERPRINT_LEN: usize = 8;

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Short deterministic digest of the canonical form of `value`
pub fn fingerprint<T: Canonicalize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    let canonical = value.canonicalize()?;
    let mut hex = sha256_hex(canonical.to_json().as_bytes());
    hex.truncate(FINGERPRINT_LEN);
    Ok(hex)
}
