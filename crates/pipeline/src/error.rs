use souschef_core::generation::GenerationStage;
use souschef_core::storage::StorageError;
use souschef_db::store::StoreError;
use souschef_provider::ProviderError;

/// Why a generation stage failed.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The generated recipe is missing required content.
    #[error("Generated recipe is incomplete: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Image storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0} stage exceeded the generation deadline")]
    Timeout(GenerationStage),

    #[error("Credential error: {0}")]
    Credential(String),

    /// The run was cancelled (rollback or shutdown) before the stage ended.
    #[error("Generation cancelled")]
    Cancelled,
}
