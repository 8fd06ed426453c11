//! Event-to-WebSocket forwarding.
//!
//! [`NotificationRouter`] subscribes to the event bus and pushes each
//! generation event to the connections of the recipe's owner. Users with
//! no open connection simply miss the push; the recipe itself is the
//! durable record.

use std::sync::Arc;

use axum::extract::ws::Message;
use souschef_events::PlatformEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

pub struct NotificationRouter {
    ws_manager: Arc<WsManager>,
}

impl NotificationRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Forward events until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.deliver(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    async fn deliver(&self, event: &PlatformEvent) {
        let msg = notification_message(event);
        let delivered = self
            .ws_manager
            .send_to_user(event.owner_id, Message::Text(msg.to_string().into()))
            .await;
        tracing::debug!(
            event_type = %event.event_type,
            recipe_id = event.recipe_id,
            user_id = event.owner_id,
            delivered,
            "Notification pushed"
        );
    }
}

/// JSON frame sent to the browser for `event`.
pub fn notification_message(event: &PlatformEvent) -> serde_json::Value {
    serde_json::json!({
        "type": "notification",
        "event_type": event.event_type,
        "recipe_id": event.recipe_id,
        "payload": event.payload,
        "timestamp": event.timestamp,
    })
}
