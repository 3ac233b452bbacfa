//! Platform Adapters
//!
//! Thin translators between the dispatcher's abstract sends and each
//! messaging platform's wire format:
//! - WhatsApp Cloud API (Graph `/messages` endpoint)
//! - Telegram Bot API
//!
//! Both implement the `Messenger` trait; everything above this module is
//! platform-agnostic.

pub mod telegram;
pub mod traits;
pub mod whatsapp;

pub use telegram::TelegramApi;
pub use traits::{truncate_message, Button, Messenger, MAX_MESSAGE_CHARS, RATING_LABELS};
pub use whatsapp::WhatsAppApi;

/// Supported platforms. Identifiers from different platforms never merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    WhatsApp,
    Telegram,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhatsApp => "whatsapp",
            Self::Telegram => "telegram",
        }
    }
}
