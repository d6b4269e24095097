//! HTTP fallback for call invitations.
//!
//! `POST` persists an `incoming_call` notification for the callee and
//! re-broadcasts it on a short-lived realtime channel; `PUT` lets the
//! callee accept or reject it.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use orkut_core::error::AppError;
use orkut_core::types::{CallAction, CallType, UserId};
use orkut_database::models::{INCOMING_CALL, IncomingCallPayload, NewCallSignal, NewNotification};
use orkut_realtime::BroadcastChannel;

use crate::dto::request::{CallNotificationRequest, CallResponseRequest};
use crate::dto::response::{CallActionResponse, CallNotificationResponse};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

const MISSING_CALL_FIELDS: &str = "targetUserId e callType são obrigatórios";
const MISSING_RESPONSE_FIELDS: &str = "callId e action são obrigatórios";
const CALLER_NOT_FOUND: &str = "Perfil do usuário não encontrado";
const TARGET_NOT_FOUND: &str = "Usuário alvo não encontrado";
const CALL_NOT_FOUND: &str = "Chamada não encontrada";
const NOTIFY_FAILED: &str = "Erro ao enviar notificação de chamada";
const CALLEE_OFFLINE: &str = "Usuário alvo está offline";

/// Signal type of the persisted offer row.
pub const CALL_OFFER_SIGNAL: &str = "call_offer";
/// Realtime event carrying the invitation.
pub const INCOMING_CALL_EVENT: &str = "incoming-call";

/// Topic the invitation is re-broadcast on.
pub fn notification_topic(target: UserId) -> String {
    format!("call-notification-{target}")
}

/// `call_{unix millis}_{9 base-36 chars}`.
pub fn generate_call_id() -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut bits = Uuid::new_v4().as_u128();
    let suffix: String = (0..9)
        .map(|_| {
            let c = ALPHABET[(bits % 36) as usize] as char;
            bits /= 36;
            c
        })
        .collect();
    format!("call_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// POST /api/call-notification
pub async fn notify_call(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<CallNotificationRequest>, JsonRejection>,
) -> ApiResult<Json<CallNotificationResponse>> {
    let Json(req) = body.map_err(|e| {
        debug!(error = %e, "Unreadable call notification body");
        AppError::validation(MISSING_CALL_FIELDS)
    })?;

    let (Some(target_raw), Some(call_type_raw)) = (
        req.target_user_id.filter(|s| !s.is_empty()),
        req.call_type.filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::validation(MISSING_CALL_FIELDS).into());
    };
    let call_type: CallType = call_type_raw.parse()?;

    let caller = state
        .stores
        .profiles
        .find_profile(auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found(CALLER_NOT_FOUND))?;

    // A malformed id cannot name an existing profile.
    let target = match target_raw.parse::<UserId>() {
        Ok(id) => state.stores.profiles.find_profile(id).await?,
        Err(_) => None,
    }
    .ok_or_else(|| AppError::not_found(TARGET_NOT_FOUND))?;

    let presence = state.stores.presence.find_presence(target.id).await?;
    let online = presence.as_ref().is_some_and(|p| p.is_online);
    debug!(
        target = %target.id,
        online,
        last_seen = ?presence.as_ref().map(|p| p.last_seen),
        "Callee presence"
    );
    if state.config.calls.require_callee_online && !online {
        return Err(AppError::conflict(CALLEE_OFFLINE).into());
    }

    let call_id = generate_call_id();
    let payload = IncomingCallPayload {
        call_id: call_id.clone(),
        call_type,
        from_user: caller.clone(),
        offer: req.offer.clone(),
        timestamp: Utc::now(),
    };
    let payload = serde_json::to_value(&payload).map_err(AppError::from)?;

    state
        .stores
        .notifications
        .insert_notification(NewNotification {
            profile_id: target.id,
            kind: INCOMING_CALL.to_string(),
            payload: payload.clone(),
        })
        .await
        .map_err(|e| {
            error!(error = %e, call_id = %call_id, "Failed to store call notification");
            AppError::internal(NOTIFY_FAILED)
        })?;

    if let Err(e) = state
        .stores
        .signals
        .insert_signal(NewCallSignal {
            from_user_id: caller.id,
            to_user_id: target.id,
            signal_type: CALL_OFFER_SIGNAL.to_string(),
            signal_data: json!({
                "call_id": call_id,
                "call_type": call_type,
                "offer": req.offer,
                "caller_info": caller,
            }),
        })
        .await
    {
        warn!(error = %e, call_id = %call_id, "Failed to store call signal");
    }

    spawn_rebroadcast(&state, target.id, payload);

    info!(
        call_id = %call_id,
        from = %caller.id,
        to = %target.id,
        call_type = %call_type,
        "Call notification sent"
    );

    Ok(Json(CallNotificationResponse {
        success: true,
        message: "Notificação de chamada enviada".to_string(),
        call_id,
        target_user: target,
    }))
}

/// Publishes the invitation on a throwaway channel, then leaves it.
fn spawn_rebroadcast(state: &AppState, target: UserId, payload: serde_json::Value) {
    let channel = state.realtime.hub.join(&notification_topic(target), None);
    let linger = Duration::from_millis(state.config.calls.rebroadcast_linger_ms);
    tokio::spawn(async move {
        if let Err(e) = channel.send(INCOMING_CALL_EVENT, payload).await {
            warn!(error = %e, target = %target, "Call notification broadcast failed");
        }
        tokio::time::sleep(linger).await;
        if let Err(e) = channel.unsubscribe().await {
            warn!(error = %e, "Failed to leave call notification channel");
        }
    });
}

/// PUT /api/call-notification
pub async fn respond_to_call(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<CallResponseRequest>, JsonRejection>,
) -> ApiResult<Json<CallActionResponse>> {
    let Json(req) = body.map_err(|e| {
        debug!(error = %e, "Unreadable call response body");
        AppError::validation(MISSING_RESPONSE_FIELDS)
    })?;

    let (Some(call_id), Some(action_raw)) = (
        req.call_id.filter(|s| !s.is_empty()),
        req.action.filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::validation(MISSING_RESPONSE_FIELDS).into());
    };
    let action: CallAction = action_raw.parse()?;

    let notification = state
        .stores
        .notifications
        .find_incoming_call(auth.user_id, &call_id)
        .await?
        .ok_or_else(|| AppError::not_found(CALL_NOT_FOUND))?;

    if let Err(e) = state.stores.notifications.mark_read(notification.id).await {
        warn!(error = %e, call_id = %call_id, "Failed to mark call notification read");
    }

    let message = match action {
        CallAction::Accept => "Chamada aceita",
        CallAction::Reject => "Chamada rejeitada",
    };
    info!(call_id = %call_id, user = %auth.user_id, action = action.as_str(), "Call answered");

    Ok(Json(CallActionResponse {
        success: true,
        message: message.to_string(),
        action: action.as_str().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_id_shape() {
        let id = generate_call_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "call");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_call_ids_differ() {
        assert_ne!(generate_call_id(), generate_call_id());
    }

    #[test]
    fn test_notification_topic() {
        let id = UserId::new();
        assert_eq!(notification_topic(id), format!("call-notification-{id}"));
    }
}
