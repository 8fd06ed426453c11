//! The per-run input bundle.

use std::time::Duration;

use souschef_core::recipe::GenerationPreferences;
use souschef_core::types::DbId;
use souschef_provider::ApiCredential;
use tokio::time::Instant;

/// Everything a run needs, fixed at run entry and dropped when it ends.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub recipe_id: DbId,
    pub owner_id: DbId,
    pub prefs: GenerationPreferences,
    pub prompt: String,
    pub credential: ApiCredential,
    /// Wall-clock limit shared by both stages.
    pub deadline: Instant,
}

impl GenerationJob {
    pub fn new(
        recipe_id: DbId,
        owner_id: DbId,
        prefs: GenerationPreferences,
        prompt: impl Into<String>,
        credential: ApiCredential,
        timeout: Duration,
    ) -> Self {
        Self {
            recipe_id,
            owner_id,
            prefs,
            prompt: prompt.into(),
            credential,
            deadline: Instant::now() + timeout,
        }
    }
}
