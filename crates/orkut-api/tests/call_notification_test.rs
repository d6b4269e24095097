//! Integration tests for the call-notification fallback.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use orkut_database::models::INCOMING_CALL;
use orkut_realtime::BroadcastChannel;
use orkut_realtime::hub::HubEvent;

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = common::TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/call-notification",
            Some(json!({ "targetUserId": "x", "callType": "audio" })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Token de autenticação não fornecido");
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let app = common::TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/call-notification",
            Some(json!({ "targetUserId": "x", "callType": "audio" })),
            Some("not-a-jwt"),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Usuário não autenticado");
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let app = common::TestApp::new();
    let alice = app.create_user("alice");
    let token = app.token_for(alice.id);

    let response = app
        .request(
            "POST",
            "/api/call-notification",
            Some(json!({ "callType": "audio" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "targetUserId e callType são obrigatórios");

    let response = app
        .request("POST", "/api/call-notification", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_caller_profile() {
    let app = common::TestApp::new();
    let bob = app.create_user("bob");
    let token = app.token_for(orkut_core::types::UserId::new());

    let response = app
        .request(
            "POST",
            "/api/call-notification",
            Some(json!({ "targetUserId": bob.id.to_string(), "callType": "audio" })),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Perfil do usuário não encontrado");
}

#[tokio::test]
async fn test_unknown_target() {
    let app = common::TestApp::new();
    let alice = app.create_user("alice");
    let token = app.token_for(alice.id);

    for target in [orkut_core::types::UserId::new().to_string(), "nobody".to_string()] {
        let response = app
            .request(
                "POST",
                "/api/call-notification",
                Some(json!({ "targetUserId": target, "callType": "video" })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body["error"], "Usuário alvo não encontrado");
    }
    assert!(app.store.signals().is_empty());
}

#[tokio::test]
async fn test_notification_is_stored_and_signal_recorded() {
    let app = common::TestApp::new();
    let alice = app.create_user("alice");
    let bob = app.create_user("bob");
    let token = app.token_for(alice.id);

    let response = app
        .request(
            "POST",
            "/api/call-notification",
            Some(json!({
                "targetUserId": bob.id.to_string(),
                "callType": "video",
                "offer": { "type": "offer", "sdp": "v=0" }
            })),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["message"], "Notificação de chamada enviada");
    assert_eq!(response.body["targetUser"]["username"], "bob");
    let call_id = response.body["callId"].as_str().unwrap().to_string();
    assert!(call_id.starts_with("call_"));

    let notifications = app.store.notifications_for(bob.id);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, INCOMING_CALL);
    assert!(!notifications[0].read);
    assert_eq!(notifications[0].payload["call_id"], call_id.as_str());
    assert_eq!(notifications[0].payload["call_type"], "video");
    assert_eq!(notifications[0].payload["from_user"]["username"], "alice");
    assert_eq!(notifications[0].payload["offer"]["sdp"], "v=0");

    let signals = app.store.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].signal_type, "call_offer");
    assert_eq!(signals[0].from_user_id, alice.id);
    assert_eq!(signals[0].to_user_id, bob.id);
    assert_eq!(signals[0].signal_data["call_id"], call_id.as_str());
    assert_eq!(signals[0].signal_data["caller_info"]["username"], "alice");
}

#[tokio::test]
async fn test_offline_callee_still_notified_by_default() {
    let app = common::TestApp::new();
    let alice = app.create_user("alice");
    let bob = app.create_user("bob");
    let token = app.token_for(alice.id);

    let response = app
        .request(
            "POST",
            "/api/call-notification",
            Some(json!({ "targetUserId": bob.id.to_string(), "callType": "audio" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_offline_callee_refused_when_required() {
    let mut config = common::test_config();
    config.calls.require_callee_online = true;
    let app = common::TestApp::with_config(config);
    let alice = app.create_user("alice");
    let bob = app.create_user("bob");
    let token = app.token_for(alice.id);

    let response = app
        .request(
            "POST",
            "/api/call-notification",
            Some(json!({ "targetUserId": bob.id.to_string(), "callType": "audio" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(app.store.notifications_for(bob.id).is_empty());
}

#[tokio::test]
async fn test_invitation_is_rebroadcast() {
    let app = common::TestApp::new();
    let alice = app.create_user("alice");
    let bob = app.create_user("bob");
    let token = app.token_for(alice.id);

    let topic = format!("call-notification-{}", bob.id);
    let listener = app.realtime.hub.join(&topic, None);
    let mut events = listener.take_events().unwrap();
    assert!(matches!(events.recv().await, Some(HubEvent::Sync { .. })));

    let response = app
        .request(
            "POST",
            "/api/call-notification",
            Some(json!({ "targetUserId": bob.id.to_string(), "callType": "audio" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("no rebroadcast")
        .expect("channel closed");
    let HubEvent::Broadcast { event, payload } = event else {
        panic!("expected broadcast, got {event:?}");
    };
    assert_eq!(event, "incoming-call");
    assert_eq!(payload["call_id"], response.body["callId"]);

    // The throwaway publisher leaves after the linger.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(app.realtime.hub.member_count(&topic), 1);
    listener.unsubscribe().await.unwrap();
}

async fn place_call(app: &common::TestApp) -> (String, String, orkut_core::types::UserId) {
    let alice = app.create_user("alice");
    let bob = app.create_user("bob");
    let response = app
        .request(
            "POST",
            "/api/call-notification",
            Some(json!({ "targetUserId": bob.id.to_string(), "callType": "audio" })),
            Some(&app.token_for(alice.id)),
        )
        .await;
    let call_id = response.body["callId"].as_str().unwrap().to_string();
    (call_id, app.token_for(bob.id), bob.id)
}

#[tokio::test]
async fn test_accept_marks_notification_read() {
    let app = common::TestApp::new();
    let (call_id, bob_token, bob) = place_call(&app).await;

    let response = app
        .request(
            "PUT",
            "/api/call-notification",
            Some(json!({ "callId": call_id, "action": "accept" })),
            Some(&bob_token),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Chamada aceita");
    assert_eq!(response.body["action"], "accept");
    assert!(app.store.notifications_for(bob)[0].read);
}

#[tokio::test]
async fn test_reject_response() {
    let app = common::TestApp::new();
    let (call_id, bob_token, _) = place_call(&app).await;

    let response = app
        .request(
            "PUT",
            "/api/call-notification",
            Some(json!({ "callId": call_id, "action": "reject" })),
            Some(&bob_token),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Chamada rejeitada");
}

#[tokio::test]
async fn test_response_for_someone_elses_call_is_not_found() {
    let app = common::TestApp::new();
    let (call_id, _, _) = place_call(&app).await;
    let mallory = app.create_user("mallory");

    let response = app
        .request(
            "PUT",
            "/api/call-notification",
            Some(json!({ "callId": call_id, "action": "accept" })),
            Some(&app.token_for(mallory.id)),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Chamada não encontrada");
}

#[tokio::test]
async fn test_response_requires_fields() {
    let app = common::TestApp::new();
    let bob = app.create_user("bob");

    let response = app
        .request(
            "PUT",
            "/api/call-notification",
            Some(json!({ "callId": "call_1_abc" })),
            Some(&app.token_for(bob.id)),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "callId e action são obrigatórios");
}
