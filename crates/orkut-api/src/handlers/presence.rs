//! Persisted online flags.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{Duration, Utc};
use tracing::debug;

use orkut_core::error::AppError;

use crate::dto::request::PresenceActionRequest;
use crate::dto::response::{MessageResponse, OnlineUsersResponse};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

const UNSUPPORTED_ACTION: &str = "Ação não suportada";

/// GET /api/presence
///
/// Users flagged online whose last activity falls inside the configured
/// window, most recent first.
pub async fn list_online(State(state): State<AppState>) -> ApiResult<Json<OnlineUsersResponse>> {
    let since = Utc::now() - Duration::seconds(state.config.presence.online_window_seconds);
    let data = state.stores.presence.list_online(since).await?;
    Ok(Json(OnlineUsersResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// POST /api/presence
pub async fn update_presence(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<PresenceActionRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let action = body.ok().and_then(|Json(req)| req.action);

    let (online, message) = match action.as_deref() {
        Some("mark_online") => (true, "Usuário marcado como online"),
        Some("mark_offline") => (false, "Usuário marcado como offline"),
        _ => return Err(AppError::validation(UNSUPPORTED_ACTION).into()),
    };

    state.stores.presence.upsert_presence(auth.user_id, online).await?;
    debug!(user = %auth.user_id, online, "Presence row updated");

    Ok(Json(MessageResponse::ok(message)))
}
