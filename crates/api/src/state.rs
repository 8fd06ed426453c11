use std::sync::Arc;

use souschef_events::EventBus;
use souschef_pipeline::GenerationOrchestrator;

use crate::config::ServerConfig;
use crate::middleware::rate_limit::{IpRateLimiter, SharedKeyLimiter};
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: souschef_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Browser WebSocket connections.
    pub ws_manager: Arc<WsManager>,
    pub event_bus: Arc<EventBus>,
    /// Starts and supervises generation runs.
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub ip_limiter: Arc<IpRateLimiter>,
    pub shared_key_limiter: Arc<SharedKeyLimiter>,
}
