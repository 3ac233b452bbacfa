//! Reply Routing
//!
//! Maps outbound bot message ids back to the text they carried, and claim
//! button ids back to the suggested claim, so follow-up events (quoted
//! replies, button taps, emoji reactions) can be resolved to their origin.
//! All tables are bounded with TTL + capacity eviction; a missed lookup is a
//! normal outcome, not an error.

use moka::future::Cache;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::time::Duration;

const BUTTON_ID_LEN: usize = 5;

/// Bounded lookup tables threading bot output to later user actions.
pub struct ReplyRouter {
    /// outbound message id -> bot response text
    replies: Cache<String, String>,
    /// button id -> suggested claim text
    buttons: Cache<String, String>,
    /// inbound message ids already dispatched (webhook redelivery guard)
    seen: Cache<String, ()>,
}

impl ReplyRouter {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let table = || {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build()
        };
        Self {
            replies: table(),
            buttons: table(),
            seen: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Track an outbound bot message. Overwrites on id collision; ids are
    /// platform-assigned and assumed unique.
    pub async fn record_reply(&self, message_id: &str, text: &str) {
        self.replies
            .insert(message_id.to_string(), text.to_string())
            .await;
    }

    /// Resolve an inbound reference to a tracked bot message.
    pub async fn resolve_reply(&self, message_id: &str) -> Option<String> {
        self.replies.get(message_id).await
    }

    /// Track a claim suggestion button.
    pub async fn record_claim_button(&self, button_id: &str, claim: &str) {
        self.buttons
            .insert(button_id.to_string(), claim.to_string())
            .await;
    }

    /// Resolve a tapped button back to its claim.
    pub async fn resolve_claim_button(&self, button_id: &str) -> Option<String> {
        self.buttons.get(button_id).await
    }

    /// Returns true exactly once per inbound message id. Platforms may
    /// redeliver webhook events; side-effecting work runs only on the first.
    pub async fn first_delivery(&self, inbound_id: &str) -> bool {
        let entry = self
            .seen
            .entry(inbound_id.to_string())
            .or_insert(())
            .await;
        entry.is_fresh()
    }

    /// Short random identifier for a suggestion button.
    pub fn new_button_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(BUTTON_ID_LEN)
            .map(char::from)
            .collect()
    }
}
