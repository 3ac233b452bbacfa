//! WhatsApp Cloud API adapter
//!
//! Sends through the Graph `/messages` endpoint: plain text (as a reply via
//! `context.message_id`), interactive reply buttons (max 3), and an
//! interactive list for the 1-6 rating prompt. Inbound media is fetched in
//! two hops: media id -> download URL -> bytes.

use super::traits::{truncate_message, Button, Messenger, RATING_LABELS};
use super::Platform;
use crate::config::Config;
use crate::error::ChannelError;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, warn};

/// Rating list messages cap the body well below the text limit.
const MAX_LIST_BODY_CHARS: usize = 1000;

/// WhatsApp Cloud API client.
pub struct WhatsAppApi {
    client: reqwest::Client,
    token: String,
    phone_number_id: String,
    graph_base: String,
}

impl WhatsAppApi {
    pub fn new(
        client: reqwest::Client,
        token: &str,
        phone_number_id: &str,
        graph_base: &str,
    ) -> Self {
        Self {
            client,
            token: token.to_string(),
            phone_number_id: phone_number_id.to_string(),
            graph_base: graph_base.trim_end_matches('/').to_string(),
        }
    }

    /// Build from config; None when credentials are absent.
    pub fn from_config(client: reqwest::Client, config: &Config) -> Option<Self> {
        let token = config.whatsapp_token.as_deref()?;
        let phone_number_id = config.whatsapp_phone_number_id.as_deref()?;
        Some(Self::new(
            client,
            token,
            phone_number_id,
            &config.graph_base_url,
        ))
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.graph_base, self.phone_number_id)
    }

    /// POST a message payload and pull the outbound id out of the response.
    async fn post_message(&self, payload: Value) -> Result<String, ChannelError> {
        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "whatsapp send failed");
            return Err(ChannelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        body.get("messages")
            .and_then(Value::as_array)
            .and_then(|m| m.first())
            .and_then(|m| m.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ChannelError::MissingMessageId)
    }

    fn base_payload(&self, phone_number: &str, reply_to: Option<&str>) -> Value {
        let mut payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": phone_number,
        });
        if let Some(id) = reply_to {
            payload["context"] = json!({ "message_id": id });
        }
        payload
    }

    /// Interactive list with the six rating rows.
    async fn send_rating_list(
        &self,
        phone_number: &str,
        body: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        let rows: Vec<Value> = RATING_LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let stars = i + 1;
                json!({
                    "id": format!("rating_{}", stars),
                    "title": format!("{} star{}", stars, if stars > 1 { "s" } else { "" }),
                    "description": label,
                })
            })
            .collect();

        let mut payload = self.base_payload(phone_number, reply_to);
        payload["type"] = json!("interactive");
        payload["interactive"] = json!({
            "type": "list",
            "header": { "type": "text", "text": "Rate this response" },
            "body": { "text": body },
            "action": {
                "button": "Rate",
                "sections": [{ "title": "Rating", "rows": rows }],
            },
        });

        self.post_message(payload).await
    }
}

#[async_trait]
impl Messenger for WhatsAppApi {
    fn platform(&self) -> Platform {
        Platform::WhatsApp
    }

    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        let message = truncate_message(text);
        if message.len() < text.len() {
            warn!(from = text.chars().count(), "whatsapp message truncated");
        }

        let mut payload = self.base_payload(chat_id, reply_to);
        payload["text"] = json!({ "body": message });
        self.post_message(payload).await
    }

    async fn send_buttons(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[Button],
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        let formatted: Vec<Value> = buttons
            .iter()
            .take(3)
            .map(|b| {
                json!({
                    "type": "reply",
                    "reply": { "id": b.id, "title": b.title },
                })
            })
            .collect();

        let mut payload = self.base_payload(chat_id, reply_to);
        payload["type"] = json!("interactive");
        payload["interactive"] = json!({
            "type": "button",
            "body": { "text": truncate_message(text) },
            "action": { "buttons": formatted },
        });

        self.post_message(payload).await
    }

    async fn send_rating(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        let message = truncate_message(text);

        // Long responses go out as plain text followed by a separate rating
        // prompt; the list body itself is capped by the platform.
        if message.chars().count() > MAX_LIST_BODY_CHARS {
            let text_id = self.send_text(chat_id, &message, reply_to).await?;
            return match self
                .send_rating_list(chat_id, "Please rate the above response 😊", reply_to)
                .await
            {
                Ok(id) => Ok(id),
                Err(e) => {
                    warn!(error = %e, "rating prompt failed, response already sent");
                    Ok(text_id)
                }
            };
        }

        match self.send_rating_list(chat_id, &message, reply_to).await {
            Ok(id) => Ok(id),
            Err(e) => {
                warn!(error = %e, "rating list failed, falling back to plain text");
                self.send_text(chat_id, &message, reply_to).await
            }
        }
    }

    async fn image_bytes(&self, media_id: &str) -> Result<Vec<u8>, ChannelError> {
        let meta: Value = self
            .client
            .get(format!("{}/{}", self.graph_base, media_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ChannelError::MediaFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| ChannelError::MediaFailed(e.to_string()))?;

        let url = meta
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ChannelError::MediaFailed("no url in media lookup".to_string()))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
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
