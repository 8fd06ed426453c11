//! The API key a generation call is made with.

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The user's own key, decrypted from storage.
    Personal,
    /// The platform-wide key.
    Platform,
}

/// A resolved, decrypted API key. The key never appears in `Debug` output.
#[derive(Clone)]
pub struct ApiCredential {
    key: String,
    source: CredentialSource,
}

impl ApiCredential {
    pub fn new(key: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            key: key.into(),
            source,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl std::fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredential")
            .field("key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}
