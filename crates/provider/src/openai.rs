//! OpenAI-compatible implementation of [`GenerationProvider`].
//!
//! Uses `POST {base}/chat/completions` with a strict JSON-schema response
//! format for recipe text, and `POST {base}/images/generations` with
//! `response_format = b64_json` for the image.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use souschef_core::recipe::RecipeDef;

use crate::credential::ApiCredential;
use crate::error::ProviderError;
use crate::retry::{error_for_status, with_retry, RetryPolicy};
use crate::schema::{parse_recipe_content, ChatMessage, RecipeRequest, RECIPE_SCHEMA_NAME};
use crate::GenerationProvider;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default chat model for recipe text.
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";
/// Default image model.
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-2";
/// Default generated image size.
pub const DEFAULT_IMAGE_SIZE: &str = "512x512";

/// Connection and model settings for [`OpenAiProvider`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub image_size: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Load from environment variables with sensible defaults.
    ///
    /// | Env var              | Default                       |
    /// |----------------------|-------------------------------|
    /// | `OPENAI_BASE_URL`    | `https://api.openai.com/v1`   |
    /// | `OPENAI_TEXT_MODEL`  | `gpt-4o-mini`                 |
    /// | `OPENAI_IMAGE_MODEL` | `dall-e-2`                    |
    /// | `OPENAI_IMAGE_SIZE`  | `512x512`                     |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            text_model: std::env::var("OPENAI_TEXT_MODEL").unwrap_or(defaults.text_model),
            image_model: std::env::var("OPENAI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            image_size: std::env::var("OPENAI_IMAGE_SIZE").unwrap_or(defaults.image_size),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    n: u32,
    response_format: Value,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Serialize)]
struct ImageBody<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// HTTP client for an OpenAI-compatible API.
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self {
            client,
            config,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// One chat-completion attempt, returning the raw reply content.
    async fn chat_attempt(
        &self,
        request: &RecipeRequest,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let body = ChatCompletionBody {
            model: &self.config.text_model,
            messages: &request.messages,
            n: request.n,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": RECIPE_SCHEMA_NAME,
                    "strict": true,
                    "schema": request.response_schema,
                }
            }),
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(credential.key())
            .json(&body)
            .send()
            .await?;

        let parsed: ChatCompletionResponse = Self::parse_response(response).await?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?
            .message;

        if let Some(refusal) = reply.refusal.filter(|r| !r.is_empty()) {
            return Err(ProviderError::SchemaViolation(format!("model refused: {refusal}")));
        }
        match reply.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(ProviderError::EmptyResponse),
        }
    }

    /// One image-generation attempt, returning the base64 payload.
    async fn image_attempt(
        &self,
        prompt: &str,
        credential: &ApiCredential,
    ) -> Result<String, ProviderError> {
        let body = ImageBody {
            model: &self.config.image_model,
            prompt,
            n: 1,
            size: &self.config.image_size,
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(self.url("images/generations"))
            .bearer_auth(credential.key())
            .json(&body)
            .send()
            .await?;

        let parsed: ImageResponse = Self::parse_response(response).await?;
        parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .filter(|b64| !b64.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }

    // ---- private helpers ----

    /// Map a non-success status to the classified [`ProviderError`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(error_for_status(status.as_u16(), body));
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    async fn generate_recipe(
        &self,
        request: &RecipeRequest,
        credential: &ApiCredential,
    ) -> Result<RecipeDef, ProviderError> {
        let content = with_retry(self.retry, move |attempt| {
            tracing::debug!(attempt, model = %self.config.text_model, "Requesting recipe text");
            self.chat_attempt(request, credential)
        })
        .await?;
        parse_recipe_content(&content)
    }

    async fn generate_image(
        &self,
        prompt: &str,
        credential: &ApiCredential,
    ) -> Result<Vec<u8>, ProviderError> {
        let encoded = with_retry(self.retry, move |attempt| {
            tracing::debug!(attempt, model = %self.config.image_model, "Requesting recipe image");
            self.image_attempt(prompt, credential)
        })
        .await?;
        BASE64
            .decode(encoded.trim())
            .map_err(|e| ProviderError::SchemaViolation(format!("image payload: {e}")))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
