//! Encryption of store snapshots for durable storage.
//!
//! The blob format is `base64(nonce || ciphertext)` where the plaintext is the
//! JSON form of `ConfigStore` and the cipher is AES-256-GCM with a random
//! 96-bit nonce per snapshot.

use std::fmt;

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit};
use base64::Engine;
use rand::RngCore;

use crate::store::ConfigStore;
use crate::utils::{EnvError, EnvResult};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Two-way transform between a store snapshot and its persisted blob.
pub trait ConfigCipher: Send + Sync {
    fn encrypt(&self, store: &ConfigStore) -> EnvResult<String>;

    /// Inverse of `encrypt`. Not used on the update path.
    fn decrypt(&self, blob: &str) -> EnvResult<ConfigStore>;
}

/// AES-256-GCM implementation of `ConfigCipher`.
pub struct AesGcmCipher {
    key: [u8; KEY_LEN],
}

impl AesGcmCipher {
    pub const fn from_bytes(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Build from a base64-encoded 32-byte key.
    pub fn from_base64(encoded: &str) -> EnvResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| EnvError::InvalidSettings(format!("encryption key is not valid base64: {}", e)))?;
        let key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            EnvError::InvalidSettings(format!(
                "encryption key must be exactly {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self { key })
    }

    /// Fresh random key, returned alongside its base64 form.
    pub fn generate() -> (Self, String) {
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        let encoded = base64::engine::general_purpose::STANDARD.encode(key);
        (Self { key }, encoded)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.key))
    }
}

impl fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmCipher").field("key", &"[redacted]").finish()
    }
}

impl ConfigCipher for AesGcmCipher {
    fn encrypt(&self, store: &ConfigStore) -> EnvResult<String> {
        let plaintext = serde_json::to_vec(store).map_err(|e| EnvError::EncryptionFailure(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| EnvError::EncryptionFailure(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }

    fn decrypt(&self, blob: &str) -> EnvResult<ConfigStore> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(blob.trim())
            .map_err(|e| EnvError::DecryptionFailure(format!("invalid base64: {}", e)))?;
        if data.len() < NONCE_LEN {
            return Err(EnvError::DecryptionFailure("encrypted data too short".to_string()));
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|e| EnvError::DecryptionFailure(e.to_string()))?;

        serde_json::from_slice(&plaintext).map_err(|e| EnvError::DecryptionFailure(e.to_string()))
    }
}
