//! Inbound webhook envelope parsing
//!
//! Platform webhook payloads are deeply nested and frequently missing keys.
//! An unrecognized or incomplete entry is skipped, never a panic. Only a
//! payload that fails the top-level shape check is rejected to the caller
//! (which answers 400).

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Telegram rating keyboard replies look like `3️⃣ Fair`.
static RATING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([1-6])\u{fe0f}\u{20e3}\s+(.+)$").unwrap());

/// One decoded platform event, normalized across WhatsApp and Telegram.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Text {
        user_id: String,
        chat_id: String,
        message_id: String,
        text: String,
        /// Bot message id this message quotes, when the platform reports one.
        replied_to: Option<String>,
    },
    ButtonReply {
        user_id: String,
        chat_id: String,
        message_id: String,
        button_id: String,
        button_title: String,
    },
    Reaction {
        user_id: String,
        chat_id: String,
        emoji: String,
        reacted_to: String,
    },
    Rating {
        user_id: String,
        chat_id: String,
        message_id: String,
        value: String,
        label: String,
    },
    Image {
        user_id: String,
        chat_id: String,
        message_id: String,
        media_id: String,
        caption: String,
    },
    Unsupported {
        user_id: String,
        chat_id: String,
        message_id: String,
    },
}

/// Decode a WhatsApp Cloud API webhook envelope. `None` means the payload is
/// not a webhook envelope at all; an empty vec means nothing actionable.
pub fn parse_whatsapp_envelope(payload: &Value) -> Option<Vec<InboundEvent>> {
    if payload.get("object").is_none() || payload.get("entry").is_none() {
        return None;
    }

    let mut events = Vec::new();

    for entry in payload
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        for change in entry
            .get("changes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let value = change.get("value").unwrap_or(&Value::Null);
            let Some(message) = value
                .get("messages")
                .and_then(Value::as_array)
                .and_then(|m| m.first())
            else {
                continue;
            };
            let Some(contact) = value
                .get("contacts")
                .and_then(Value::as_array)
                .and_then(|c| c.first())
            else {
                continue;
            };

            let phone = contact
                .get("wa_id")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            if phone.is_empty() {
                continue;
            }
            let message_id = message
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();

            if let Some(event) = decode_whatsapp_message(message, &phone, &message_id) {
                events.push(event);
            }
        }
    }

    Some(events)
}

fn decode_whatsapp_message(
    message: &Value,
    phone: &str,
    message_id: &str,
) -> Option<InboundEvent> {
    let user_id = phone.to_string();
    let chat_id = phone.to_string();
    let message_id = message_id.to_string();

    match message.get("type").and_then(Value::as_str) {
        Some("text") => {
            let text = message
                .get("text")
                .and_then(|t| t.get("body"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let replied_to = message
                .get("context")
                .and_then(|c| c.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(InboundEvent::Text {
                user_id,
                chat_id,
                message_id,
                text,
                replied_to,
            })
        }
        Some("interactive") => {
            let interactive = message.get("interactive")?;
            match interactive.get("type").and_then(Value::as_str) {
                Some("button_reply") => {
                    let reply = interactive.get("button_reply")?;
                    Some(InboundEvent::ButtonReply {
                        user_id,
                        chat_id,
                        message_id,
                        button_id: reply.get("id")?.as_str()?.to_string(),
                        button_title: reply
                            .get("title")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string(),
                    })
                }
                Some("list_reply") => {
                    let reply = interactive.get("list_reply")?;
                    let id = reply.get("id")?.as_str()?;
                    let title = reply
                        .get("title")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string();
                    // Rating rows are the only list we send.
                    let value = id.strip_prefix("rating_")?;
                    Some(InboundEvent::Rating {
                        user_id,
                        chat_id,
                        message_id,
                        value: value.to_string(),
                        label: title,
                    })
                }
                _ => None,
            }
        }
        Some("reaction") => {
            let reaction = message.get("reaction")?;
            Some(InboundEvent::Reaction {
                user_id,
                chat_id,
                emoji: reaction
                    .get("emoji")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                reacted_to: reaction
                    .get("message_id")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            })
        }
        Some("image") => {
            let image = message.get("image")?;
            let media_id = image.get("id").and_then(Value::as_str)?.to_string();
            Some(InboundEvent::Image {
                user_id,
                chat_id,
                message_id,
                media_id,
                caption: image
                    .get("caption")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            })
        }
        _ => Some(InboundEvent::Unsupported {
            user_id,
            chat_id,
            message_id,
        }),
    }
}

/// Decode a Telegram update. `None` when the update carries nothing this bot
/// handles (edited messages, polls, ...).
pub fn parse_telegram_update(update: &Value) -> Option<InboundEvent> {
    if let Some(callback) = update.get("callback_query") {
        let chat_id = callback
            .get("message")
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .map(id_to_string)?;
        let message_id = callback
            .get("message")
            .and_then(|m| m.get("message_id"))
            .map(id_to_string)
            .unwrap_or_default();
        return Some(InboundEvent::ButtonReply {
            user_id: chat_id.clone(),
            chat_id,
            message_id,
            button_id: callback.get("data")?.as_str()?.to_string(),
            button_title: String::new(),
        });
    }

    let message = update.get("message")?;
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .map(id_to_string)?;
    let message_id = message.get("message_id").map(id_to_string)?;
    let user_id = chat_id.clone();

    if let Some(text) = message.get("text").and_then(Value::as_str) {
        if let Some(captures) = RATING_RE.captures(text) {
            return Some(InboundEvent::Rating {
                user_id,
                chat_id,
                message_id,
                value: captures[1].to_string(),
                label: captures[2].to_string(),
            });
        }
        let replied_to = message
            .get("reply_to_message")
            .and_then(|r| r.get("message_id"))
            .map(id_to_string);
        return Some(InboundEvent::Text {
            user_id,
            chat_id,
            message_id,
            text: text.to_string(),
            replied_to,
        });
    }

    if let Some(photos) = message.get("photo").and_then(Value::as_array) {
        // Telegram lists every thumbnail size; the last entry is the largest.
        let media_id = photos
            .last()
            .and_then(|p| p.get("file_id"))
            .and_then(Value::as_str)?
            .to_string();
        return Some(InboundEvent::Image {
            user_id,
            chat_id,
            message_id,
            media_id,
            caption: message
                .get("caption")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        });
    }

    Some(InboundEvent::Unsupported {
        user_id,
        chat_id,
        message_id,
    })
}

/// Telegram ids arrive as numbers, WhatsApp ids as strings.
fn id_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
