//! At-rest encryption for users' personal provider API keys.
//!
//! Keys are sealed with AES-256-GCM. The stored form is
//! `base64(nonce || ciphertext)` with a fresh 96-bit nonce per encryption.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Length in bytes of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// Length in bytes of the GCM nonce prepended to every ciphertext.
pub const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Encryption key must be {KEY_LEN} bytes of base64, got {0} bytes")]
    InvalidKeyLength(usize),

    #[error("Stored value is not valid base64")]
    Encoding,

    #[error("Stored value is too short to contain a nonce")]
    Truncated,

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed (wrong key or tampered value)")]
    Decrypt,
}

/// Symmetric cipher for personal API keys.
#[derive(Clone)]
pub struct ApiKeyCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for ApiKeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKeyCipher(..)")
    }
}

impl ApiKeyCipher {
    /// Build from a base64-encoded 32-byte key (the `API_KEY_ENCRYPTION_KEY`
    /// environment variable).
    pub fn from_base64_key(encoded: &str) -> Result<Self, CryptoError> {
        let raw = BASE64
            .decode(encoded.trim())
            .map_err(|_| CryptoError::Encoding)?;
        Self::from_key_bytes(&raw)
    }

    pub fn from_key_bytes(raw: &[u8]) -> Result<Self, CryptoError> {
        if raw.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength(raw.len()));
        }
        let cipher =
            Aes256Gcm::new_from_slice(raw).map_err(|_| CryptoError::InvalidKeyLength(raw.len()))?;
        Ok(Self { cipher })
    }

    /// Encrypt a plaintext key into its stored form.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Decrypt a stored value back into the plaintext key.
    pub fn decrypt(&self, stored: &str) -> Result<String, CryptoError> {
        let sealed = BASE64
            .decode(stored.trim())
            .map_err(|_| CryptoError::Encoding)?;
        if sealed.len() <= NONCE_LEN {
            return Err(CryptoError::Truncated);
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
    }
}
