use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use souschef_core::types::DbId;

use crate::middleware::auth::WsUser;
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// GET /api/v1/ws?token=...
///
/// The token is checked before the upgrade; an invalid one gets a plain 401.
pub async fn ws_handler(
    user: WsUser,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user.user_id, state.ws_manager))
}

/// Pump queued messages out to the socket until either side closes.
///
/// The socket is push-only; inbound frames other than Close are ignored.
async fn handle_socket(socket: WebSocket, user_id: DbId, ws_manager: Arc<WsManager>) {
    let (socket_id, mut outbound) = ws_manager.register(user_id).await;
    tracing::info!(%socket_id, user_id, "WebSocket connected");

    let (mut sink, mut inbound) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let closing = matches!(frame, Message::Close(_));
            if sink.send(frame).await.is_err() || closing {
                break;
            }
        }
    });

    loop {
        match inbound.next().await {
            None | Some(Ok(Message::Close(_))) => break,
            Some(Ok(Message::Pong(_))) => tracing::trace!(%socket_id, "Pong"),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(%socket_id, error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    ws_manager.unregister(user_id, socket_id).await;
    writer.abort();
    tracing::info!(%socket_id, user_id, "WebSocket disconnected");
}
