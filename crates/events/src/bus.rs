//! Broadcast-backed event bus.
//!
//! [`EventBus`] is shared via `Arc<EventBus>`. The generation pipeline
//! publishes one [`PlatformEvent`] per finished run; the API's notification
//! router forwards them to the owner's WebSocket connections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souschef_core::generation::events;
use souschef_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// Something that happened to a recipe, addressed to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"recipe.generation.completed"`.
    pub event_type: String,

    pub recipe_id: DbId,

    /// User the event is delivered to.
    pub owner_id: DbId,

    /// Event-specific detail.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>, recipe_id: DbId, owner_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            recipe_id,
            owner_id,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Text and image both stored.
    pub fn generation_completed(recipe_id: DbId, owner_id: DbId) -> Self {
        Self::new(events::GENERATION_COMPLETED, recipe_id, owner_id)
    }

    /// Text stored, image missing. `reason` says why.
    pub fn generation_partial(recipe_id: DbId, owner_id: DbId, reason: &str) -> Self {
        Self::new(events::GENERATION_PARTIAL, recipe_id, owner_id)
            .with_payload(serde_json::json!({ "reason": reason }))
    }

    /// Draft rolled back. `reason` says why.
    pub fn generation_failed(recipe_id: DbId, owner_id: DbId, reason: &str) -> Self {
        Self::new(events::GENERATION_FAILED, recipe_id, owner_id)
            .with_payload(serde_json::json!({ "reason": reason }))
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// Slow receivers that fall more than the capacity behind observe
/// `RecvError::Lagged` and miss the oldest events.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Returns how many received it;
    /// with no subscribers the event is dropped.
    pub fn publish(&self, event: PlatformEvent) -> usize {
        let event_type = event.event_type.clone();
        let recipe_id = event.recipe_id;
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!(%event_type, recipe_id, "Event dropped, no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
