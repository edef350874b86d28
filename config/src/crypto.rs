//! At-rest protection for the repository bearer token.
//!
//! The token is sealed with AES-256-GCM under a key derived from the
//! hostname and username, so a copied session file is useless elsewhere.
//! Sealed form: base64(nonce || ciphertext).

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::Rng;
use sha2::{Digest, Sha256};

const NONCE_SIZE: usize = 12;
const KEY_LABEL: &[u8] = b"v1-services-token-v1";

/// Seals and opens tokens with a fixed 256-bit key
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Cipher keyed to the current machine and user
    pub fn for_this_machine() -> Result<Self, String> {
        let host = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string());
        let user = whoami::username();
        Self::from_identity(&host, &user)
    }

    /// Cipher keyed to an explicit host/user pair
    pub fn from_identity(host: &str, user: &str) -> Result<Self, String> {
        let mut hasher = Sha256::new();
        hasher.update(KEY_LABEL);
        hasher.update(host.as_bytes());
        hasher.update(b":");
        hasher.update(user.as_bytes());
        let key = hasher.finalize();

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| format!("Failed to create cipher: {}", e))?;
        Ok(Self { cipher })
    }

    pub fn seal(&self, token: &str) -> Result<String, String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), token.as_bytes())
            .map_err(|e| format!("Encryption failed: {}", e))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(BASE64.encode(out))
    }

    pub fn open(&self, sealed: &str) -> Result<String, String> {
        let raw = BASE64
            .decode(sealed)
            .map_err(|e| format!("Failed to decode base64: {}", e))?;

        if raw.len() < NONCE_SIZE {
            return Err("Sealed token too short".to_string());
        }

        let (nonce_bytes, body) = raw.split_at(NONCE_SIZE);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), body)
            .map_err(|e| format!("Decryption failed: {}", e))?;

        String::from_utf8(plain).map_err(|e| format!("Invalid UTF-8 in token: {}", e))
    }
}
