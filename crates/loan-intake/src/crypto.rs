//! Symmetric encryption for application payloads at rest.
//!
//! Payloads are serialized to JSON, sealed with AES-256-GCM under a key derived from the
//! configured secret, and stored as base64 of `nonce (12) || ciphertext || tag`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

const NONCE_LEN: usize = 12;

/// Encryption failures. Messages never carry key material or plaintext.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key is not configured")]
    MissingKey,
    #[error("payload could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("payload could not be deserialized: {0}")]
    Deserialize(#[source] serde_json::Error),
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed (wrong key or corrupted data)")]
    Decrypt,
    #[error("encrypted payload is malformed")]
    Malformed,
}

/// Process-wide cipher built once from `APPLICATION_ENCRYPTION_KEY`.
#[derive(Clone)]
pub struct PayloadCipher {
    key: [u8; 32],
}

impl PayloadCipher {
    pub fn from_secret(secret: &str) -> Result<Self, CryptoError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(CryptoError::MissingKey);
        }

        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Ok(Self { key })
    }

    /// Serialize and encrypt `value`, returning the base64 blob.
    pub fn seal<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CryptoError> {
        let plaintext = serde_json::to_vec(value).map_err(CryptoError::Serialize)?;
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::Encrypt)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    /// Decrypt a blob produced by [`PayloadCipher::seal`].
    pub fn open<T: DeserializeOwned>(&self, blob: &str) -> Result<T, CryptoError> {
        let sealed = STANDARD
            .decode(blob.trim())
            .map_err(|_| CryptoError::Malformed)?;
        if sealed.len() <= NONCE_LEN {
            return Err(CryptoError::Malformed);
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::Decrypt)?;
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;

        serde_json::from_slice(&plaintext).map_err(CryptoError::Deserialize)
    }
}

impl fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayloadCipher(<redacted>)")
    }
}
