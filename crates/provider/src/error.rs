use std::time::Duration;

/// Errors from a generation provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The credential was rejected (HTTP 401). Never retried.
    #[error("Provider rejected the credential: {body}")]
    Authorization { body: String },

    /// Rate limited or server-side failure. Retried by [`crate::with_retry`]
    /// and only surfaced wrapped in [`ProviderError::RetriesExhausted`].
    #[error("Transient provider failure ({status}): {body}")]
    Transient {
        status: u16,
        body: String,
        retry_after: Duration,
    },

    /// Every allowed attempt failed transiently.
    #[error("Provider still failing after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ProviderError>,
    },

    /// The provider answered successfully but with no content.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// The content did not match the expected shape.
    #[error("Provider response did not match the schema: {0}")]
    SchemaViolation(String),

    /// Any other failure: unexpected status, transport error, bad client setup.
    #[error("Provider call failed: {0}")]
    Unhandled(String),
}

impl ProviderError {
    /// Delay requested by a transient failure, `None` for every other kind.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unhandled(err.to_string())
    }
}
