pub mod health;
pub mod recipes;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                              WebSocket (?token=)
///
/// /recipes                         generate (POST, auth)
/// /recipes/{id}                    get (public), soft delete (DELETE, owner)
/// /recipes/{id}/restore            restore from trash (POST, owner)
/// /recipes/history/{history_id}    history entries (public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/recipes", recipes::router())
}
