//! Client for the external text and image generation API.
//!
//! [`GenerationProvider`] is the seam the pipeline calls through.
//! [`OpenAiProvider`] speaks the OpenAI-compatible HTTP API. The retry
//! classification in [`retry`] does not depend on any provider.

pub mod credential;
pub mod error;
pub mod openai;
pub mod retry;
pub mod schema;

pub use credential::{ApiCredential, CredentialSource};
pub use error::ProviderError;
pub use openai::{OpenAiProvider, ProviderConfig};
pub use retry::{classify_status, with_retry, RetryDecision, RetryPolicy};
pub use schema::{ChatMessage, RecipeRequest};

use async_trait::async_trait;
use souschef_core::recipe::RecipeDef;

/// A text and image generation backend.
///
/// Implementations are stateless and shared behind `Arc`. Dropping a
/// returned future abandons the in-flight call.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a structured recipe.
    async fn generate_recipe(
        &self,
        request: &RecipeRequest,
        credential: &ApiCredential,
    ) -> Result<RecipeDef, ProviderError>;

    /// Generate one image and return its decoded bytes.
    async fn generate_image(
        &self,
        prompt: &str,
        credential: &ApiCredential,
    ) -> Result<Vec<u8>, ProviderError>;

    /// Short name used in logs (e.g. "openai").
    fn provider_name(&self) -> &'static str;
}
