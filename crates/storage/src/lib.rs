//! S3-backed [`ImageStore`] for generated recipe images.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use souschef_core::storage::{ImageStore, StorageError};

/// Fallback content type when the bytes are not a recognised image.
const OCTET_STREAM: &str = "application/octet-stream";

/// Bucket and public URL settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    /// Base URL objects are served from, without trailing slash.
    pub public_base_url: String,
}

impl StorageConfig {
    /// Load from environment variables.
    ///
    /// | Env var              | Default                                |
    /// |----------------------|----------------------------------------|
    /// | `S3_BUCKET`          | (required)                             |
    /// | `S3_PUBLIC_BASE_URL` | `https://{bucket}.s3.amazonaws.com`    |
    ///
    /// Returns `None` when `S3_BUCKET` is unset.
    pub fn from_env() -> Option<Self> {
        let bucket = std::env::var("S3_BUCKET").ok().filter(|b| !b.is_empty())?;
        let public_base_url = std::env::var("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{bucket}.s3.amazonaws.com"));
        Some(Self {
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Public URL of the object stored under `key`.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key.trim_start_matches('/'))
    }
}

/// Content type sniffed from the leading bytes.
pub fn content_type_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(OCTET_STREAM)
}

/// [`ImageStore`] writing to a single S3 bucket.
pub struct S3ImageStore {
    client: Client,
    config: StorageConfig,
}

impl S3ImageStore {
    /// Build a client from the default AWS credential chain.
    pub async fn connect(config: StorageConfig) -> Self {
        let aws = aws_config::defaults(BehaviorVersion::latest()).load().await;
        tracing::info!(bucket = %config.bucket, "S3 image store initialized");
        Self::with_client(Client::new(&aws), config)
    }

    pub fn with_client(client: Client, config: StorageConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload_image(&self, bytes: Vec<u8>, key: &str) -> Result<String, StorageError> {
        let content_type = content_type_for(&bytes);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(key, size, content_type, "Uploaded image");
        Ok(self.config.public_url(key))
    }

    async fn delete_image(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(key, "Deleted image");
        Ok(())
    }
}
