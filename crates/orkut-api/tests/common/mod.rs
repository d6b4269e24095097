//! Shared helpers for the API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use orkut_api::{AppState, Stores, build_app};
use orkut_auth::jwt::JwtEncoder;
use orkut_core::config::AppConfig;
use orkut_core::types::UserId;
use orkut_database::MemoryStore;
use orkut_database::models::Profile;
use orkut_realtime::RealtimeEngine;

/// Test application over the in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub realtime: Arc<RealtimeEngine>,
    pub config: AppConfig,
    encoder: JwtEncoder,
}

/// Response status plus parsed JSON body (`Null` when empty).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let realtime = Arc::new(RealtimeEngine::new(config.realtime.clone()));
        let state = AppState::new(
            config.clone(),
            Stores::memory(store.clone()),
            realtime.clone(),
        );
        Self {
            router: build_app(state),
            store,
            realtime,
            encoder: JwtEncoder::new(&config.auth),
            config,
        }
    }

    /// Seed a profile and return it.
    pub fn create_user(&self, username: &str) -> Profile {
        let profile = Profile {
            id: UserId::new(),
            username: Some(username.to_string()),
            display_name: Some(username.to_uppercase()),
            photo_url: None,
        };
        self.store.insert_profile(profile.clone());
        profile
    }

    pub fn token_for(&self, user: UserId) -> String {
        self.encoder
            .generate_access_token(user)
            .expect("Failed to sign token")
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.database.url = String::new();
    config.calls.rebroadcast_linger_ms = 50;
    config
}
