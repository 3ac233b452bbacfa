//! Webhook Endpoint Integration Tests
//!
//! Exercises the HTTP boundary with an in-memory router and a scripted
//! fact service: verification handshake, envelope intake, and the
//! feedback dump.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use factibot::error::ApiError;
use factibot::factiverse::FactService;
use factibot::server::{self, AppState};
use factibot::Config;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct StubService;

#[async_trait]
impl FactService for StubService {
    async fn generate(&self, _prompt: &str, _text: &str) -> Result<String, ApiError> {
        Ok("stub response".to_string())
    }

    async fn stance_detection(&self, _claim: &str) -> Result<Value, ApiError> {
        Ok(json!({ "claims": [] }))
    }

    async fn fact_check(&self, _claims: &[String], _url: &str) -> Result<Value, ApiError> {
        Ok(json!({ "claims": [] }))
    }

    async fn detect_claims(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}

fn test_app() -> (Router, Arc<AppState>, TempDir) {
    let temp = TempDir::new().expect("temp dir");
    let mut config = Config::for_tests();
    config.feedback_db_path = temp.path().join("feedback.db");

    let state = Arc::new(
        AppState::new(config, Arc::new(StubService), None, None).expect("app state"),
    );
    (server::router(state.clone()), state, temp)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _state, _temp) = test_app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_verification_handshake_echoes_challenge() {
    let (app, _state, _temp) = test_app();

    let uri = "/webhook?hub.mode=subscribe&hub.verify_token=test-verify-token&hub.challenge=challenge-42";
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"challenge-42");
}

#[tokio::test]
async fn test_verification_rejects_wrong_token() {
    let (app, _state, _temp) = test_app();

    let uri = "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=challenge-42";
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_verification_rejects_wrong_mode() {
    let (app, _state, _temp) = test_app();

    let uri = "/webhook?hub.mode=unsubscribe&hub.verify_token=test-verify-token&hub.challenge=c";
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_verification_rejects_missing_params() {
    let (app, _state, _temp) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_whatsapp_envelope_acknowledged_fast() {
    let (app, _state, _temp) = test_app();

    let envelope = json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "entry-1",
            "changes": [{
                "value": {
                    "messages": [{"type": "text", "id": "wamid.1", "text": {"body": "hello"}}],
                    "contacts": [{"wa_id": "4915551234"}],
                }
            }]
        }]
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(envelope.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "received" }));
}

#[tokio::test]
async fn test_whatsapp_malformed_envelope_rejected() {
    let (app, _state, _temp) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "entry": [] }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_telegram_update_acknowledged() {
    let (app, _state, _temp) = test_app();

    let update = json!({
        "message": {
            "message_id": 7,
            "chat": {"id": 4242},
            "text": "hello bot",
        }
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tgwebhook")
                .header("content-type", "application/json")
                .body(Body::from(update.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "processing" }));
}

#[tokio::test]
async fn test_telegram_unhandled_update_ignored() {
    let (app, _state, _temp) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tgwebhook")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "edited_message": {} }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ignored" }));
}

#[tokio::test]
async fn test_telegram_management_unavailable_without_adapter() {
    let (app, _state, _temp) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/telegram/webhook/set")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "url": "https://example.com/tg" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_feedback_dump() {
    let (app, state, _temp) = test_app();

    state.feedback.insert("👍", "a good answer").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/feedback")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["emoji"], "👍");
    assert_eq!(body[0]["message_text"], "a good answer");
}
