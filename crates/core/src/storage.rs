//! Object-storage seam for generated recipe images.
//!
//! The S3 implementation lives in `souschef-storage`; tests use in-memory
//! fakes.

use async_trait::async_trait;

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },

    #[error("Delete of '{key}' failed: {message}")]
    Delete { key: String, message: String },
}

/// Deterministic object key for a recipe's image.
///
/// Re-uploading for the same recipe overwrites the previous object.
pub fn image_key(recipe_id: DbId) -> String {
    format!("recipes/{recipe_id}/image.png")
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL.
    async fn upload_image(&self, bytes: Vec<u8>, key: &str) -> Result<String, StorageError>;

    /// Remove the object at `key`. Deleting a missing key is not an error.
    async fn delete_image(&self, key: &str) -> Result<(), StorageError>;
}
