//! Hourly purge of recipes left in the trash past their grace window.
//!
//! The image object is deleted before the row. If the object delete fails
//! the row is kept so the next pass retries it.

use std::sync::Arc;
use std::time::Duration;

use souschef_core::storage::{image_key, ImageStore};
use souschef_db::repositories::RecipeRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Upper bound on recipes purged per pass.
const BATCH_SIZE: i64 = 100;

pub async fn run(
    pool: PgPool,
    images: Arc<dyn ImageStore>,
    grace_days: i32,
    cancel: CancellationToken,
) {
    tracing::info!(
        grace_days,
        interval_secs = PURGE_INTERVAL.as_secs(),
        "Recipe purge job started"
    );

    let mut interval = tokio::time::interval(PURGE_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Recipe purge job stopping");
                break;
            }
            _ = interval.tick() => {
                match purge_expired(&pool, images.as_ref(), grace_days).await {
                    Ok(0) => tracing::debug!("Recipe purge: nothing to purge"),
                    Ok(purged) => tracing::info!(purged, "Recipe purge: removed expired recipes"),
                    Err(e) => tracing::error!(error = %e, "Recipe purge failed"),
                }
            }
        }
    }
}

/// One purge pass. Returns the number of recipes hard-deleted.
pub async fn purge_expired(
    pool: &PgPool,
    images: &dyn ImageStore,
    grace_days: i32,
) -> Result<usize, sqlx::Error> {
    let candidates = RecipeRepo::list_expired_trash(pool, grace_days, BATCH_SIZE).await?;
    let mut purged = 0;

    for candidate in candidates {
        // The key is deterministic, so an object uploaded before a failed URL
        // write is found even when `image_url` is null. Missing keys are not
        // an error.
        if let Err(e) = images.delete_image(&image_key(candidate.id)).await {
            tracing::warn!(
                recipe_id = candidate.id,
                had_url = candidate.image_url.is_some(),
                error = %e,
                "Image delete failed, keeping recipe for retry"
            );
            continue;
        }
        if RecipeRepo::hard_delete(pool, candidate.id).await? {
            purged += 1;
        }
    }

    Ok(purged)
}
