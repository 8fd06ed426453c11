//! Picks the API key a run is made with.

use souschef_core::crypto::{ApiKeyCipher, CryptoError};
use souschef_db::models::user::User;
use souschef_provider::{ApiCredential, CredentialSource};

use crate::error::GenerationError;

/// Resolves a user's personal key, falling back to the platform key.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    platform_key: Option<String>,
    cipher: Option<ApiKeyCipher>,
}

impl CredentialResolver {
    pub fn new(platform_key: Option<String>, cipher: Option<ApiKeyCipher>) -> Self {
        Self {
            platform_key: platform_key.filter(|k| !k.trim().is_empty()),
            cipher,
        }
    }

    /// Load from environment variables.
    ///
    /// | Env var                  | Meaning                                    |
    /// |--------------------------|--------------------------------------------|
    /// | `OPENAI_API_KEY`         | Platform key used when a user has none     |
    /// | `API_KEY_ENCRYPTION_KEY` | Base64 AES-256 key for stored personal keys |
    pub fn from_env() -> Result<Self, CryptoError> {
        let platform_key = std::env::var("OPENAI_API_KEY").ok();
        let cipher = match std::env::var("API_KEY_ENCRYPTION_KEY") {
            Ok(encoded) if !encoded.trim().is_empty() => {
                Some(ApiKeyCipher::from_base64_key(&encoded)?)
            }
            _ => None,
        };
        Ok(Self::new(platform_key, cipher))
    }

    /// The credential for `user`.
    ///
    /// A stored personal key that cannot be decrypted is an error rather
    /// than a silent fallback to the platform key.
    pub fn resolve(&self, user: &User) -> Result<ApiCredential, GenerationError> {
        if user.has_personal_key() {
            let stored = user.encrypted_api_key.as_deref().unwrap_or_default();
            let cipher = self.cipher.as_ref().ok_or_else(|| {
                GenerationError::Credential("personal keys cannot be decrypted: no encryption key configured".into())
            })?;
            let key = cipher
                .decrypt(stored)
                .map_err(|e| GenerationError::Credential(e.to_string()))?;
            return Ok(ApiCredential::new(key, CredentialSource::Personal));
        }

        self.platform_key
            .as_deref()
            .map(|key| ApiCredential::new(key, CredentialSource::Platform))
            .ok_or_else(|| GenerationError::Credential("no platform API key configured".into()))
    }
}
