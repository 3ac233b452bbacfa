//! Messenger trait and shared outbound types.
//!
//! The dispatcher speaks in abstract sends (text, claim buttons, rating
//! prompt); each platform adapter translates those into its wire format and
//! returns the platform-assigned message id for reply routing.

use super::Platform;
use crate::error::ChannelError;
use async_trait::async_trait;

/// Hard platform cap shared by WhatsApp and Telegram.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Labels for the 1-6 rating scale, low to high.
pub const RATING_LABELS: [&str; 6] = [
    "Very poor",
    "Poor",
    "Fair",
    "Good",
    "Very good",
    "Excellent",
];

/// One interactive claim-suggestion button.
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub id: String,
    pub title: String,
}

impl Button {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Platform adapter seam. Implementations must be safe to call concurrently.
#[async_trait]
pub trait Messenger: Send + Sync {
    fn platform(&self) -> Platform;

    /// Send plain text, optionally as a reply. Returns the outbound id.
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError>;

    /// Send text with up to 3 claim-suggestion buttons.
    async fn send_buttons(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[Button],
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError>;

    /// Send text together with a 1-6 rating prompt.
    async fn send_rating(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError>;

    /// Fetch raw image bytes for an inbound media id.
    async fn image_bytes(&self, media_id: &str) -> Result<Vec<u8>, ChannelError>;
}

/// Cap outbound text at the platform limit, keeping an ellipsis marker.
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_MESSAGE_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(truncate_message("hello"), "hello");
    }

    #[test]
    fn test_exactly_at_limit_untouched() {
        let text = "a".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(truncate_message(&text), text);
    }

    #[test]
    fn test_over_limit_truncated_with_marker() {
        let text = "a".repeat(5000);
        let out = truncate_message(&text);
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().take_while(|c| *c == 'a').count(), 4093);
    }

    #[test]
    fn test_truncation_is_char_safe() {
        let text = "é".repeat(5000);
        let out = truncate_message(&text);
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS);
    }
}
