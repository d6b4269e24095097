//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use orkut_core::error::AppError;
use orkut_core::types::UserId;
use orkut_realtime::connection::heartbeat::{HeartbeatConfig, run_heartbeat};

use crate::error::ApiResult;
use crate::extractors::auth::{MISSING_TOKEN, NOT_AUTHENTICATED};
use crate::state::AppState;

/// Query parameters for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /ws?token={jwt}
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::authentication(MISSING_TOKEN))?;
    let claims = state.jwt_decoder.decode_access_token(&token).map_err(|e| {
        debug!(error = %e.message, "WebSocket token rejected");
        AppError::authentication(NOT_AUTHENTICATED)
    })?;
    let user_id = claims.user_id();

    Ok(ws.on_upgrade(move |socket| handle_socket(state, user_id, socket)))
}

/// Pumps frames between the socket and the connection manager.
async fn handle_socket(state: AppState, user_id: UserId, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let connections = state.realtime.connections.clone();
    let (handle, mut outbound_rx) = connections.register(user_id);
    let conn_id = handle.id;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode outbound message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut heartbeat = tokio::spawn(run_heartbeat(
        handle.clone(),
        HeartbeatConfig::from(connections.config()),
    ));

    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    connections.handle_inbound(&conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = &mut send_task => break,
            _ = &mut heartbeat => break,
        }
    }

    send_task.abort();
    heartbeat.abort();
    connections.unregister(&conn_id);

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}
