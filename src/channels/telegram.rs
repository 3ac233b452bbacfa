//! Telegram Bot API adapter
//!
//! Sends via `sendMessage` with HTML parse mode (basic `*bold*` markdown is
//! converted to `<b>` tags), an inline keyboard for claim buttons, and a
//! one-time reply keyboard for the 1-6 rating scale. Also owns webhook
//! registration and the getFile media lookup.

use super::traits::{truncate_message, Button, Messenger, RATING_LABELS};
use super::Platform;
use crate::config::Config;
use crate::error::ChannelError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{error, warn};

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());

/// Telegram Bot API client.
pub struct TelegramApi {
    client: reqwest::Client,
    api_base: String,
    file_base: String,
}

impl TelegramApi {
    pub fn new(client: reqwest::Client, token: &str, telegram_base: &str) -> Self {
        let base = telegram_base.trim_end_matches('/');
        Self {
            client,
            api_base: format!("{}/bot{}", base, token),
            file_base: format!("{}/file/bot{}", base, token),
        }
    }

    /// Build from config; None when no bot token is set.
    pub fn from_config(client: reqwest::Client, config: &Config) -> Option<Self> {
        let token = config.telegram_token.as_deref()?;
        Some(Self::new(client, token, &config.telegram_base_url))
    }

    async fn call(&self, method: &str, payload: &Value) -> Result<Value, ChannelError> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, method, %body, "telegram call failed");
            return Err(ChannelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }

    /// Send a message payload and return `result.message_id`.
    async fn send_message(&self, mut payload: Value, reply_to: Option<&str>) -> Result<String, ChannelError> {
        if let Some(id) = reply_to {
            // Telegram wants the numeric id; ours round-tripped as a string.
            match id.parse::<i64>() {
                Ok(n) => payload["reply_to_message_id"] = json!(n),
                Err(_) => payload["reply_to_message_id"] = json!(id),
            }
        }

        let body = self.call("sendMessage", &payload).await?;
        body.get("result")
            .and_then(|r| r.get("message_id"))
            .and_then(Value::as_i64)
            .map(|id| id.to_string())
            .ok_or(ChannelError::MissingMessageId)
    }

    /// Register the webhook URL for message and callback updates.
    pub async fn set_webhook(&self, webhook_url: &str) -> Result<Value, ChannelError> {
        let payload = json!({
            "url": webhook_url,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call("setWebhook", &payload).await
    }

    /// Remove the registered webhook.
    pub async fn delete_webhook(&self) -> Result<Value, ChannelError> {
        self.call("deleteWebhook", &json!({})).await
    }
}

/// Convert the generator's `*bold*` markers to Telegram HTML.
pub fn markdown_to_html(text: &str) -> String {
    BOLD_RE.replace_all(text, "<b>$1</b>").to_string()
}

#[async_trait]
impl Messenger for TelegramApi {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        let message = truncate_message(text);
        if message.len() < text.len() {
            warn!(from = text.chars().count(), "telegram message truncated");
        }

        let payload = json!({
            "chat_id": chat_id,
            "text": markdown_to_html(&message),
            "parse_mode": "HTML",
        });
        self.send_message(payload, reply_to).await
    }

    async fn send_buttons(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[Button],
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        let row: Vec<Value> = buttons
            .iter()
            .take(3)
            .map(|b| json!({ "text": b.title, "callback_data": b.id }))
            .collect();

        let payload = json!({
            "chat_id": chat_id,
            "text": markdown_to_html(&truncate_message(text)),
            "parse_mode": "HTML",
            "reply_markup": { "inline_keyboard": [row] },
        });
        self.send_message(payload, reply_to).await
    }

    async fn send_rating(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        let keyboard: Vec<Vec<Value>> = RATING_LABELS
            .chunks(3)
            .enumerate()
            .map(|(row_idx, labels)| {
                labels
                    .iter()
                    .enumerate()
                    .map(|(i, label)| {
                        let stars = row_idx * 3 + i + 1;
                        json!({ "text": format!("{}\u{fe0f}\u{20e3} {}", stars, label) })
                    })
                    .collect()
            })
            .collect();

        let message = format!(
            "📊 Please rate this response (1-6)\n\n{}",
            truncate_message(text)
        );

        let payload = json!({
            "chat_id": chat_id,
            "text": markdown_to_html(&message),
            "parse_mode": "HTML",
            "reply_markup": {
                "keyboard": keyboard,
                "resize_keyboard": true,
                "one_time_keyboard": true,
            },
        });
        self.send_message(payload, reply_to).await
    }

    async fn image_bytes(&self, media_id: &str) -> Result<Vec<u8>, ChannelError> {
        let lookup = self
            .call("getFile", &json!({ "file_id": media_id }))
            .await
            .map_err(|e| ChannelError::MediaFailed(e.to_string()))?;

        let file_path = lookup
            .get("result")
            .and_then(|r| r.get("file_path"))
            .and_then(Value::as_str)
            .ok_or_else(|| ChannelError::MediaFailed("no file_path in getFile".to_string()))?;

        let response = self
            .client
            .get(format!("{}/{}", self.file_base, file_path))
            .send()
            .await
            .map_err(|e| ChannelError::MediaFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChannelError::MediaFailed(format!(
                "download returned {}",
                response.status()
            )));
        }

        Ok(response
            .bytes()
            .await
            .map_err(|e| ChannelError::MediaFailed(e.to_string()))?
            .to_vec())
    }
}
