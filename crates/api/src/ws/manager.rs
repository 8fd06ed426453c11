use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use souschef_core::types::{DbId, Timestamp};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Queue feeding one socket's writer task.
pub type OutboundTx = mpsc::UnboundedSender<Message>;

/// One open socket belonging to a user.
pub struct UserSocket {
    pub id: Uuid,
    pub outbound: OutboundTx,
    pub opened_at: Timestamp,
}

/// Open sockets grouped by owning user.
///
/// Notifications are addressed to a user, so delivery is a single map
/// lookup. A user may hold several sockets (one per tab).
#[derive(Default)]
pub struct WsManager {
    by_user: RwLock<HashMap<DbId, Vec<UserSocket>>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a socket for `user_id`. Returns its id and the receiver the
    /// writer task drains.
    pub async fn register(&self, user_id: DbId) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let socket = UserSocket {
            id: Uuid::new_v4(),
            outbound,
            opened_at: chrono::Utc::now(),
        };
        let id = socket.id;
        self.by_user.write().await.entry(user_id).or_default().push(socket);
        (id, rx)
    }

    pub async fn unregister(&self, user_id: DbId, socket_id: Uuid) {
        let mut by_user = self.by_user.write().await;
        let Some(sockets) = by_user.get_mut(&user_id) else {
            return;
        };
        if let Some(pos) = sockets.iter().position(|s| s.id == socket_id) {
            let socket = sockets.swap_remove(pos);
            let open_secs = (chrono::Utc::now() - socket.opened_at).num_seconds();
            tracing::debug!(%socket_id, user_id, open_secs, "WebSocket unregistered");
        }
        if sockets.is_empty() {
            by_user.remove(&user_id);
        }
    }

    /// Queue `message` on every socket `user_id` has open and return how
    /// many accepted it. A closed queue is left for its reader loop to
    /// unregister.
    pub async fn send_to_user(&self, user_id: DbId, message: Message) -> usize {
        let by_user = self.by_user.read().await;
        by_user.get(&user_id).map_or(0, |sockets| {
            sockets
                .iter()
                .filter(|s| s.outbound.send(message.clone()).is_ok())
                .count()
        })
    }

    pub async fn connection_count(&self) -> usize {
        self.by_user.read().await.values().map(Vec::len).sum()
    }

    /// Keep-alive ping on every socket.
    pub async fn ping_all(&self) {
        self.broadcast(&Message::Ping(Bytes::new())).await;
    }

    /// Ask every socket to close, then drop the whole registry.
    pub async fn shutdown_all(&self) {
        let closed = self.broadcast(&Message::Close(None)).await;
        self.by_user.write().await.clear();
        tracing::info!(closed, "WebSocket registry cleared");
    }

    async fn broadcast(&self, message: &Message) -> usize {
        let by_user = self.by_user.read().await;
        by_user
            .values()
            .flatten()
            .filter(|s| s.outbound.send(message.clone()).is_ok())
            .count()
    }
}
