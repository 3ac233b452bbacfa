//! HTTP boundary
//!
//! Webhook endpoints for both platforms plus the feedback dump and Telegram
//! webhook management. POST handlers acknowledge immediately and do the real
//! work in spawned tasks; the platform never sees an error for a turn that
//! failed downstream.

use crate::channels::{Messenger, Platform, TelegramApi, WhatsAppApi};
use crate::config::Config;
use crate::conversation::{ConversationLog, UserKey};
use crate::dispatch::{Dispatcher, Outcome};
use crate::events::{parse_telegram_update, parse_whatsapp_envelope, InboundEvent};
use crate::factiverse::FactService;
use crate::feedback::FeedbackStore;
use crate::normalize::normalize_message;
use crate::ocr;
use crate::routing::ReplyRouter;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

const NO_IMAGE_TEXT_MSG: &str =
    "I can only understand text in images...\nNo text was found in this one.";
const UNSUPPORTED_MSG: &str = "Sorry, I can only process text and image messages.";

/// Shared application state behind every handler.
pub struct AppState {
    pub config: Config,
    pub log: Arc<ConversationLog>,
    pub routes: Arc<ReplyRouter>,
    pub feedback: Arc<FeedbackStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub whatsapp: Option<Arc<WhatsAppApi>>,
    pub telegram: Option<Arc<TelegramApi>>,
}

impl AppState {
    pub fn new(
        config: Config,
        svc: Arc<dyn FactService>,
        whatsapp: Option<WhatsAppApi>,
        telegram: Option<TelegramApi>,
    ) -> anyhow::Result<Self> {
        let log = Arc::new(ConversationLog::new(config.context_max_lines));
        let routes = Arc::new(ReplyRouter::new(
            config.routing_capacity,
            Duration::from_secs(config.routing_ttl_secs),
        ));
        let feedback = Arc::new(FeedbackStore::open(&config.feedback_db_path)?);
        let dispatcher = Arc::new(Dispatcher::new(
            svc,
            routes.clone(),
            feedback.clone(),
            config.long_message_words,
        ));

        Ok(Self {
            config,
            log,
            routes,
            feedback,
            dispatcher,
            whatsapp: whatsapp.map(Arc::new),
            telegram: telegram.map(Arc::new),
        })
    }

    fn messenger(&self, platform: Platform) -> Option<Arc<dyn Messenger>> {
        match platform {
            Platform::WhatsApp => self
                .whatsapp
                .clone()
                .map(|api| api as Arc<dyn Messenger>),
            Platform::Telegram => self
                .telegram
                .clone()
                .map(|api| api as Arc<dyn Messenger>),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhook", get(verify_webhook).post(whatsapp_webhook))
        .route("/tgwebhook", post(telegram_webhook))
        .route("/telegram/webhook/set", post(telegram_set_webhook))
        .route("/telegram/webhook/delete", post(telegram_delete_webhook))
        .route("/feedback", get(feedback_dump))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// WhatsApp Cloud API verification handshake: echo the challenge when the
/// token matches, 403 otherwise.
async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    if mode == Some("subscribe") && token == Some(state.config.verify_token.as_str()) {
        challenge.into_response()
    } else {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "detail": "Verification failed" })),
        )
            .into_response()
    }
}

async fn whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Response {
    let Some(events) = parse_whatsapp_envelope(&payload) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Invalid webhook format" })),
        )
            .into_response();
    };

    for event in events {
        tokio::spawn(handle_event(state.clone(), Platform::WhatsApp, event));
    }

    Json(json!({ "status": "received" })).into_response()
}

async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    Json(update): Json<Value>,
) -> Json<Value> {
    match parse_telegram_update(&update) {
        Some(event) => {
            tokio::spawn(handle_event(state.clone(), Platform::Telegram, event));
            Json(json!({ "status": "processing" }))
        }
        None => Json(json!({ "status": "ignored" })),
    }
}

#[derive(Debug, Deserialize)]
struct WebhookTarget {
    url: String,
}

async fn telegram_set_webhook(
    State(state): State<Arc<AppState>>,
    Json(target): Json<WebhookTarget>,
) -> Response {
    let Some(telegram) = &state.telegram else {
        return telegram_unconfigured();
    };
    match telegram.set_webhook(&target.url).await {
        Ok(result) => Json(json!({ "status": "success", "result": result })).into_response(),
        Err(e) => {
            error!(error = %e, "webhook setup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn telegram_delete_webhook(State(state): State<Arc<AppState>>) -> Response {
    let Some(telegram) = &state.telegram else {
        return telegram_unconfigured();
    };
    match telegram.delete_webhook().await {
        Ok(result) => Json(json!({ "status": "success", "result": result })).into_response(),
        Err(e) => {
            error!(error = %e, "webhook removal failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn telegram_unconfigured() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "detail": "Telegram adapter not configured" })),
    )
        .into_response()
}

async fn feedback_dump(State(state): State<Arc<AppState>>) -> Response {
    match state.feedback.all() {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            error!(error = %e, "feedback query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "feedback unavailable" })),
            )
                .into_response()
        }
    }
}

/// One spawned task per inbound event. The webhook response has already been
/// sent; everything here is best-effort with its own error handling.
pub async fn handle_event(state: Arc<AppState>, platform: Platform, event: InboundEvent) {
    match event {
        InboundEvent::Text {
            user_id,
            chat_id,
            message_id,
            text,
            replied_to,
        } => {
            if !state.routes.first_delivery(&message_id).await {
                debug!(%message_id, "duplicate delivery dropped");
                return;
            }

            let text = normalize_message(&text);
            if text.is_empty() {
                return;
            }

            let key = UserKey::new(platform, &user_id);
            info!(platform = platform.as_str(), user = %user_id, "user message received");

            state.log.append_user(&key, &text);
            let mut context = state.log.render_context(&key, true);

            // A quoted reply to a tracked bot message pins that message into
            // the context for this turn.
            if let Some(replied_id) = replied_to {
                if let Some(quoted) = state.routes.resolve_reply(&replied_id).await {
                    context.push_str(&format!(
                        "\n\nUser is currently replying to: {}\n",
                        quoted.replace('"', "'")
                    ));
                }
            }

            let outcome = state.dispatcher.handle_text(&text, &context).await;
            deliver(&state, platform, &key, &chat_id, &message_id, outcome, true).await;
        }

        InboundEvent::ButtonReply {
            user_id,
            chat_id,
            message_id,
            button_id,
            button_title,
        } => {
            if !state.routes.first_delivery(&message_id).await {
                return;
            }

            let Some(claim) = state.routes.resolve_claim_button(&button_id).await else {
                debug!(%button_id, "tap on unknown or expired button");
                return;
            };

            let key = UserKey::new(platform, &user_id);
            let context = state.log.render_context(&key, false);
            let title = if button_title.is_empty() {
                claim.clone()
            } else {
                button_title
            };
            state.log.append(&key, format!("User selected: {}\n", title));
            info!(claim = %claim, "user selected suggested claim");

            let outcome = state.dispatcher.handle_claim(&claim, &context).await;
            deliver(&state, platform, &key, &chat_id, &message_id, outcome, true).await;
        }

        InboundEvent::Reaction {
            user_id,
            chat_id: _,
            emoji,
            reacted_to,
        } => {
            let key = UserKey::new(platform, &user_id);
            state.log.append(
                &key,
                format!("User reacted with '{}' on message '{}'\n", emoji, reacted_to),
            );

            if emoji == "👍" || emoji == "👎" {
                let target = state
                    .routes
                    .resolve_reply(&reacted_to)
                    .await
                    .unwrap_or_default();
                state.dispatcher.handle_reaction(&emoji, &target);
            }
        }

        InboundEvent::Rating {
            user_id,
            chat_id,
            message_id,
            value,
            label,
        } => {
            if !state.routes.first_delivery(&message_id).await {
                return;
            }

            let key = UserKey::new(platform, &user_id);
            state
                .log
                .append(&key, format!("User rated with '{}' ({})\n", value, label));
            state.dispatcher.handle_rating(&value, &label);

            let thanks = format!("Thanks for your {}-star rating!", value);
            deliver(
                &state,
                platform,
                &key,
                &chat_id,
                &message_id,
                Outcome::Reply(thanks),
                false,
            )
            .await;
        }

        InboundEvent::Image {
            user_id,
            chat_id,
            message_id,
            media_id,
            caption,
        } => {
            if !state.routes.first_delivery(&message_id).await {
                return;
            }

            let key = UserKey::new(platform, &user_id);
            let Some(messenger) = state.messenger(platform) else {
                warn!(platform = platform.as_str(), "no adapter configured for image");
                return;
            };

            let extracted = image_text(&state, messenger.as_ref(), &media_id, &caption).await;
            let text = match extracted {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => {
                    deliver(
                        &state,
                        platform,
                        &key,
                        &chat_id,
                        &message_id,
                        Outcome::Reply(NO_IMAGE_TEXT_MSG.to_string()),
                        false,
                    )
                    .await;
                    return;
                }
                Err(e) => {
                    error!(error = %e, "image processing failed");
                    deliver(
                        &state,
                        platform,
                        &key,
                        &chat_id,
                        &message_id,
                        Outcome::Reply(
                            "Failed to process the image. Please try again.".to_string(),
                        ),
                        false,
                    )
                    .await;
                    return;
                }
            };

            state
                .log
                .append(&key, format!("User sent image with text: {}\n", text));
            let context = state.log.render_context(&key, true);

            let outcome = state
                .dispatcher
                .handle_text(&normalize_message(&text), &context)
                .await;
            deliver(&state, platform, &key, &chat_id, &message_id, outcome, true).await;
        }

        InboundEvent::Unsupported {
            user_id,
            chat_id,
            message_id,
        } => {
            let key = UserKey::new(platform, &user_id);
            deliver(
                &state,
                platform,
                &key,
                &chat_id,
                &message_id,
                Outcome::Reply(UNSUPPORTED_MSG.to_string()),
                false,
            )
            .await;
        }
    }
}

/// Fetch the image and OCR it; caption text is appended when present.
async fn image_text(
    state: &AppState,
    messenger: &dyn Messenger,
    media_id: &str,
    caption: &str,
) -> anyhow::Result<String> {
    let bytes = messenger.image_bytes(media_id).await?;
    let text = ocr::extract_text(&state.config.tesseract_bin, &bytes).await?;

    let mut full = text;
    if !caption.is_empty() {
        if !full.is_empty() {
            full.push('\n');
        }
        full.push_str(caption);
    }
    Ok(full)
}

/// Send an outcome through the platform adapter, then thread it into the
/// routing table and the conversation log.
async fn deliver(
    state: &AppState,
    platform: Platform,
    key: &UserKey,
    chat_id: &str,
    reply_to: &str,
    outcome: Outcome,
    add_rating: bool,
) {
    let Some(messenger) = state.messenger(platform) else {
        warn!(
            platform = platform.as_str(),
            "no adapter configured, dropping response"
        );
        return;
    };

    let reply_to = (!reply_to.is_empty()).then_some(reply_to);
    let sent = match &outcome {
        Outcome::Reply(text) if add_rating => messenger.send_rating(chat_id, text, reply_to).await,
        Outcome::Reply(text) => messenger.send_text(chat_id, text, reply_to).await,
        Outcome::Suggestions { text, buttons } => {
            messenger.send_buttons(chat_id, text, buttons, reply_to).await
        }
    };

    match sent {
        Ok(bot_message_id) => {
            state.routes.record_reply(&bot_message_id, outcome.text()).await;
            state.log.append_bot(key, outcome.text());
        }
        Err(e) => error!(error = %e, "send failed"),
    }
}
