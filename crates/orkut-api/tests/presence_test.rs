//! Integration tests for the persisted presence routes.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

#[tokio::test]
async fn test_mark_online_then_listed() {
    let app = common::TestApp::new();
    let alice = app.create_user("alice");
    let token = app.token_for(alice.id);

    let response = app
        .request(
            "POST",
            "/api/presence",
            Some(json!({ "action": "mark_online" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Usuário marcado como online");

    let response = app.request("GET", "/api/presence", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 1);
    assert_eq!(response.body["data"][0]["username"], "alice");

    let response = app
        .request(
            "POST",
            "/api/presence",
            Some(json!({ "action": "mark_offline" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.body["message"], "Usuário marcado como offline");

    let response = app.request("GET", "/api/presence", None, None).await;
    assert_eq!(response.body["count"], 0);
}

#[tokio::test]
async fn test_stale_rows_are_not_listed() {
    let app = common::TestApp::new();
    let fresh = app.create_user("fresh");
    let stale = app.create_user("stale");
    app.store.set_presence(fresh.id, true, Utc::now() - Duration::seconds(30));
    app.store.set_presence(stale.id, true, Utc::now() - Duration::minutes(6));

    let response = app.request("GET", "/api/presence", None, None).await;
    assert_eq!(response.body["count"], 1);
    assert_eq!(response.body["data"][0]["user_id"], fresh.id.to_string());
}

#[tokio::test]
async fn test_unsupported_action() {
    let app = common::TestApp::new();
    let alice = app.create_user("alice");

    let response = app
        .request(
            "POST",
            "/api/presence",
            Some(json!({ "action": "dance" })),
            Some(&app.token_for(alice.id)),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Ação não suportada");
}

#[tokio::test]
async fn test_update_requires_auth() {
    let app = common::TestApp::new();
    let response = app
        .request("POST", "/api/presence", Some(json!({ "action": "mark_online" })), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_counts() {
    let app = common::TestApp::new();
    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["ws_connections"], 0);
}
