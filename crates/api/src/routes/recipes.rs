//! Route definitions for the `/recipes` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::recipes;
use crate::state::AppState;

/// Routes mounted at `/recipes`.
///
/// ```text
/// POST   /                        -> create
/// GET    /{id}                    -> get_by_id
/// DELETE /{id}                    -> delete
/// POST   /{id}/restore            -> restore
/// GET    /history/{history_id}    -> get_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(recipes::create))
        .route("/{id}", get(recipes::get_by_id).delete(recipes::delete))
        .route("/{id}/restore", post(recipes::restore))
        .route("/history/{history_id}", get(recipes::get_history))
}
