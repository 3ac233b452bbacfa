//! factibot
//!
//! Fact-checking chatbot backend for WhatsApp Cloud API and Telegram.
//!
//! # Features
//!
//! - **Webhooks**: verification handshake + fast-ack event intake for both
//!   platforms, real work in background tasks
//! - **Dispatch**: URL fact-check / claim detection / intent classification
//!   with concurrent stance detection and partial-failure isolation
//! - **Context**: bounded per-user conversation log feeding generation calls
//! - **Reply routing**: bot message ids and suggestion buttons resolve back
//!   to their claims on replies, taps and reactions
//! - **Feedback**: reactions and 1-6 ratings persisted to SQLite
//!
//! # Architecture
//!
//! ```text
//! Platform webhook ──► Normalizer ──► Conversation Log ──► Dispatcher
//!                                                              │
//!                                        Fact-check service ◄──┤
//!                                                              ▼
//!                       Reply Router ◄── Platform Adapter ◄── Outcome
//! ```

pub mod channels;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod evidence;
pub mod factiverse;
pub mod feedback;
pub mod intent;
pub mod normalize;
pub mod ocr;
pub mod prompts;
pub mod routing;
pub mod server;

pub use channels::{Button, Messenger, Platform, TelegramApi, WhatsAppApi};
pub use config::Config;
pub use conversation::{ConversationLog, UserKey};
pub use dispatch::{Dispatcher, Outcome};
pub use error::{ApiError, ChannelError};
pub use events::InboundEvent;
pub use evidence::{clean_facts, ClaimVerdict, EvidenceItem};
pub use factiverse::{FactService, FactiverseClient};
pub use feedback::{FeedbackEntry, FeedbackStore};
pub use intent::Intent;
pub use normalize::normalize_message;
pub use routing::ReplyRouter;
pub use server::AppState;
