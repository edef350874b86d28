//! Password digests for comparison at login

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the UTF-8 password. Unsalted.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// True if `password` hashes to `expected`
pub fn verify_password(password: &str, expected: &str) -> bool {
    hash_password(password) == expected
}
