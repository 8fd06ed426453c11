//! Bodies of the text and image stages.
//!
//! Each stage races the run's cancellation token and reports exactly once
//! on its oneshot channel.

use std::sync::Arc;

use souschef_core::recipe::{validate_recipe_def, RecipeDef};
use souschef_core::storage::ImageStore;
use souschef_db::models::history::NewHistoryEntry;
use souschef_db::models::recipe::Recipe;
use souschef_db::store::RecipeStore;
use souschef_provider::{ApiCredential, GenerationProvider, RecipeRequest};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::error::GenerationError;
use crate::job::GenerationJob;
use crate::tags::TagAssociator;

pub(crate) type TextResult = Result<Recipe, GenerationError>;
pub(crate) type ImageResult = Result<Vec<u8>, GenerationError>;

/// Collaborators shared by every run of an orchestrator.
pub(crate) struct RunDeps {
    pub store: Arc<dyn RecipeStore>,
    pub images: Arc<dyn ImageStore>,
    pub provider: Arc<dyn GenerationProvider>,
    pub tags: TagAssociator,
    pub tracker: TaskTracker,
}

// ---------------------------------------------------------------------------
// Text stage
// ---------------------------------------------------------------------------

pub(crate) async fn text_stage(
    deps: Arc<RunDeps>,
    job: Arc<GenerationJob>,
    cancel: CancellationToken,
    done: oneshot::Sender<TextResult>,
    image_done: oneshot::Sender<ImageResult>,
) {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        result = generate_text(&deps, &job, &cancel, image_done) => result,
    };

    if let Err(e) = &result {
        tracing::warn!(stage = "text", error = %e, "Text stage failed");
    }
    let _ = done.send(result);
}

async fn generate_text(
    deps: &RunDeps,
    job: &GenerationJob,
    cancel: &CancellationToken,
    image_done: oneshot::Sender<ImageResult>,
) -> TextResult {
    let request = RecipeRequest::for_prompt(&job.prompt, &job.prefs);
    let def = deps
        .provider
        .generate_recipe(&request, &job.credential)
        .await?;
    tracing::info!(
        stage = "text",
        provider = deps.provider.provider_name(),
        title = %def.title,
        "Recipe text generated"
    );

    deps.tracker.spawn(
        image_stage(
            Arc::clone(&deps.provider),
            def.image_prompt.clone(),
            job.credential.clone(),
            cancel.clone(),
            image_done,
        )
        .in_current_span(),
    );

    let entry = history_entry(&job.prompt, &def)?;
    validate_populated(&def, &entry)?;
    let recipe = deps
        .store
        .update_recipe_def(job.recipe_id, &def, &entry)
        .await?;

    if let Err(e) = deps.tags.associate(job.recipe_id, &def.hashtags).await {
        tracing::warn!(stage = "text", error = %e, "Tag association failed, keeping recipe untagged");
    }

    Ok(recipe)
}

fn history_entry(prompt: &str, def: &RecipeDef) -> Result<NewHistoryEntry, GenerationError> {
    let response =
        serde_json::to_value(def).map_err(|e| GenerationError::Validation(e.to_string()))?;
    Ok(NewHistoryEntry {
        prompt: prompt.to_string(),
        response,
    })
}

/// A populated recipe needs every core field and a history entry.
fn validate_populated(def: &RecipeDef, entry: &NewHistoryEntry) -> Result<(), GenerationError> {
    validate_recipe_def(def).map_err(|e| GenerationError::Validation(e.to_string()))?;
    if entry.response.is_null() {
        return Err(GenerationError::Validation("history entry has no response".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Image stage
// ---------------------------------------------------------------------------

pub(crate) async fn image_stage(
    provider: Arc<dyn GenerationProvider>,
    prompt: String,
    credential: ApiCredential,
    cancel: CancellationToken,
    done: oneshot::Sender<ImageResult>,
) {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        result = provider.generate_image(&prompt, &credential) => result.map_err(GenerationError::from),
    };

    let provider = provider.provider_name();
    match &result {
        Ok(bytes) => tracing::info!(stage = "image", provider, size = bytes.len(), "Recipe image generated"),
        Err(e) => tracing::warn!(stage = "image", provider, error = %e, "Image stage failed"),
    }
    let _ = done.send(result);
}
