//! Handlers for the `/recipes` resource.
//!
//! Generation is asynchronous: `POST /recipes` answers 202 with the empty
//! draft and the outcome arrives later over the WebSocket channel.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use souschef_core::error::CoreError;
use souschef_core::generation::validate_prompt;
use souschef_core::types::DbId;
use souschef_db::models::history::HistoryEntry;
use souschef_db::models::recipe::{CreateRecipe, Recipe, RecipeDetail};
use souschef_db::repositories::{HistoryRepo, RecipeRepo, UserRepo};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /recipes`.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRecipeRequest {
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,
}

/// POST /api/v1/recipes
///
/// Create an empty draft owned by the caller and start generating it.
/// Callers on the platform key share one rate-limit bucket.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<GenerateRecipeRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Recipe>>)> {
    input.validate()?;
    validate_prompt(&input.prompt)?;

    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        })?;

    if !user.has_personal_key() && !state.shared_key_limiter.check() {
        tracing::info!(user_id = user.id, "Shared API key rate limit exceeded");
        return Err(CoreError::RateLimited(
            "Generation on the shared API key is busy, try again shortly or add your own key"
                .into(),
        )
        .into());
    }

    let draft = RecipeRepo::create(
        &state.pool,
        &CreateRecipe {
            created_by: user.id,
            forked_from_id: None,
        },
    )
    .await?;

    let handle = state.orchestrator.run_generation(&draft, &user, &input.prompt);
    tracing::info!(recipe_id = handle.recipe_id(), user_id = user.id, "Generation started");

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: draft })))
}

/// GET /api/v1/recipes/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<RecipeDetail>>> {
    let detail = RecipeRepo::find_detail(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Recipe",
            id,
        })?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/v1/recipes/history/{history_id}
///
/// Prompt/response exchanges of a recipe, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    Path(history_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<HistoryEntry>>>> {
    HistoryRepo::find_by_id(&state.pool, history_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "RecipeHistory",
            id: history_id,
        })?;
    let entries = HistoryRepo::list_entries(&state.pool, history_id).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// DELETE /api/v1/recipes/{id}
///
/// Move the caller's recipe to the trash.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let recipe = RecipeRepo::find_active(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Recipe",
            id,
        })?;
    ensure_owner(&recipe, &auth)?;

    if RecipeRepo::soft_delete(&state.pool, id).await? {
        tracing::info!(recipe_id = id, user_id = auth.user_id, "Recipe moved to trash");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Recipe",
            id,
        }))
    }
}

/// POST /api/v1/recipes/{id}/restore
///
/// Bring the caller's recipe back from the trash. 404 if it is not in the
/// trash, 409 once the grace window has passed.
pub async fn restore(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Recipe>>> {
    let recipe = RecipeRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|r| r.deleted_at.is_some())
        .ok_or(CoreError::NotFound {
            entity: "TrashedRecipe",
            id,
        })?;
    ensure_owner(&recipe, &auth)?;

    if !RecipeRepo::restore(&state.pool, id, state.config.trash_grace_days).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Recipe {id} was trashed more than {} days ago and can no longer be restored",
            state.config.trash_grace_days
        ))));
    }

    let restored = RecipeRepo::find_active(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Recipe",
            id,
        })?;
    tracing::info!(recipe_id = id, user_id = auth.user_id, "Recipe restored");
    Ok(Json(DataResponse { data: restored }))
}

// ── Private helpers ──────────────────────────────────────────────────────

fn ensure_owner(recipe: &Recipe, auth: &AuthUser) -> AppResult<()> {
    if recipe.created_by == auth.user_id {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "Only the recipe's owner can do that".into(),
        )))
    }
}
