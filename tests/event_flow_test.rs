//! Event Flow Integration Tests
//!
//! Drives the background event workers directly (no platform adapters
//! registered, so sends are dropped) and checks the state they leave
//! behind: conversation log, redelivery guard, and feedback rows.

use async_trait::async_trait;
use factibot::channels::Platform;
use factibot::conversation::UserKey;
use factibot::error::ApiError;
use factibot::events::InboundEvent;
use factibot::factiverse::FactService;
use factibot::server::{handle_event, AppState};
use factibot::Config;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

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

fn test_state() -> (Arc<AppState>, TempDir) {
    let temp = TempDir::new().expect("temp dir");
    let mut config = Config::for_tests();
    config.feedback_db_path = temp.path().join("feedback.db");

    let state =
        AppState::new(config, Arc::new(StubService), None, None).expect("app state");
    (Arc::new(state), temp)
}

fn text_event(message_id: &str, text: &str) -> InboundEvent {
    InboundEvent::Text {
        user_id: "4915551234".to_string(),
        chat_id: "4915551234".to_string(),
        message_id: message_id.to_string(),
        text: text.to_string(),
        replied_to: None,
    }
}

#[tokio::test]
async fn test_text_event_appends_user_line() {
    let (state, _temp) = test_state();
    let key = UserKey::new(Platform::WhatsApp, "4915551234");

    handle_event(state.clone(), Platform::WhatsApp, text_event("m1", "hello there")).await;

    let context = state.log.render_context(&key, false);
    assert!(context.contains("User: hello there"));
}

#[tokio::test]
async fn test_redelivered_event_processed_once() {
    let (state, _temp) = test_state();
    let key = UserKey::new(Platform::WhatsApp, "4915551234");

    handle_event(state.clone(), Platform::WhatsApp, text_event("m1", "hello")).await;
    handle_event(state.clone(), Platform::WhatsApp, text_event("m1", "hello")).await;

    assert_eq!(state.log.line_count(&key), 1);
}

#[tokio::test]
async fn test_normalization_applied_before_logging() {
    let (state, _temp) = test_state();
    let key = UserKey::new(Platform::WhatsApp, "4915551234");

    handle_event(
        state.clone(),
        Platform::WhatsApp,
        text_event("m1", "\u{201c}quoted\u{201d} claim"),
    )
    .await;

    let context = state.log.render_context(&key, false);
    assert!(context.contains("\"quoted\" claim"));
    assert!(!context.contains('\u{201c}'));
}

#[tokio::test]
async fn test_thumbs_reaction_stored_with_resolved_text() {
    let (state, _temp) = test_state();

    state
        .routes
        .record_reply("wamid.bot.1", "That claim is incorrect.")
        .await;

    handle_event(
        state.clone(),
        Platform::WhatsApp,
        InboundEvent::Reaction {
            user_id: "4915551234".to_string(),
            chat_id: "4915551234".to_string(),
            emoji: "👍".to_string(),
            reacted_to: "wamid.bot.1".to_string(),
        },
    )
    .await;

    let feedback = state.feedback.all().unwrap();
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].emoji, "👍");
    assert_eq!(feedback[0].message_text, "That claim is incorrect.");

    let key = UserKey::new(Platform::WhatsApp, "4915551234");
    assert!(state
        .log
        .render_context(&key, false)
        .contains("User reacted with '👍'"));
}

#[tokio::test]
async fn test_other_emoji_logged_but_not_stored() {
    let (state, _temp) = test_state();

    handle_event(
        state.clone(),
        Platform::WhatsApp,
        InboundEvent::Reaction {
            user_id: "4915551234".to_string(),
            chat_id: "4915551234".to_string(),
            emoji: "🎉".to_string(),
            reacted_to: "wamid.bot.1".to_string(),
        },
    )
    .await;

    assert!(state.feedback.all().unwrap().is_empty());
}

#[tokio::test]
async fn test_rating_event_stored_and_logged() {
    let (state, _temp) = test_state();
    let key = UserKey::new(Platform::Telegram, "4242");

    handle_event(
        state.clone(),
        Platform::Telegram,
        InboundEvent::Rating {
            user_id: "4242".to_string(),
            chat_id: "4242".to_string(),
            message_id: "m9".to_string(),
            value: "5".to_string(),
            label: "Very good".to_string(),
        },
    )
    .await;

    let feedback = state.feedback.all().unwrap();
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].emoji, "5");
    assert_eq!(feedback[0].message_text, "Very good");

    assert!(state
        .log
        .render_context(&key, false)
        .contains("User rated with '5' (Very good)"));
}

#[tokio::test]
async fn test_unknown_button_tap_is_ignored() {
    let (state, _temp) = test_state();
    let key = UserKey::new(Platform::Telegram, "4242");

    handle_event(
        state.clone(),
        Platform::Telegram,
        InboundEvent::ButtonReply {
            user_id: "4242".to_string(),
            chat_id: "4242".to_string(),
            message_id: "m10".to_string(),
            button_id: "nope1".to_string(),
            button_title: String::new(),
        },
    )
    .await;

    assert_eq!(state.log.line_count(&key), 0);
}

#[tokio::test]
async fn test_known_button_tap_logs_selection() {
    let (state, _temp) = test_state();
    let key = UserKey::new(Platform::Telegram, "4242");

    state
        .routes
        .record_claim_button("aB3xZ", "The moon is rock")
        .await;

    handle_event(
        state.clone(),
        Platform::Telegram,
        InboundEvent::ButtonReply {
            user_id: "4242".to_string(),
            chat_id: "4242".to_string(),
            message_id: "m11".to_string(),
            button_id: "aB3xZ".to_string(),
            button_title: String::new(),
        },
    )
    .await;

    assert!(state
        .log
        .render_context(&key, false)
        .contains("User selected: The moon is rock"));
}

#[tokio::test]
async fn test_platform_contexts_stay_separate() {
    let (state, _temp) = test_state();

    handle_event(state.clone(), Platform::WhatsApp, text_event("m1", "from whatsapp")).await;
    handle_event(
        state.clone(),
        Platform::Telegram,
        InboundEvent::Text {
            user_id: "4915551234".to_string(),
            chat_id: "4915551234".to_string(),
            message_id: "m2".to_string(),
            text: "from telegram".to_string(),
            replied_to: None,
        },
    )
    .await;

    let wa = UserKey::new(Platform::WhatsApp, "4915551234");
    let tg = UserKey::new(Platform::Telegram, "4915551234");
    assert!(!state.log.render_context(&wa, false).contains("from telegram"));
    assert!(!state.log.render_context(&tg, false).contains("from whatsapp"));
}
