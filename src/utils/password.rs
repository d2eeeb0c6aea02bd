//! Credential hashing for desk users.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hashes `password` with `salt` and returns the lowercase hex digest.
#[must_use]
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks `password` against a stored salted hash in constant time.
#[must_use]
pub fn verify_password(salt: &str, password: &str, stored_hash: &str) -> bool {
    let computed = hash_password(salt, password);
    let stored = stored_hash.trim().to_ascii_lowercase();
    computed.as_bytes().ct_eq(stored.as_bytes()).into()
}
