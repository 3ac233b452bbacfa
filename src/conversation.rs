//! Conversation Log
//!
//! Per-user ordered history of "User: ..." / "Bot: ..." lines, used to build
//! the context string handed to generation calls. Bounded to a rolling window
//! per user; entries beyond the window are dropped oldest-first.

use crate::channels::Platform;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Conversation key. Identifiers from different platforms are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserKey {
    pub platform: Platform,
    pub user_id: String,
}

impl UserKey {
    pub fn new(platform: Platform, user_id: &str) -> Self {
        Self {
            platform,
            user_id: user_id.to_string(),
        }
    }
}

/// In-memory conversation history, one rolling window per user.
///
/// Appends are serialized by the lock; concurrent webhook deliveries for the
/// same user cannot interleave or drop lines. Platform delivery order is not
/// guaranteed, so insertion order is the accepted conversational order.
pub struct ConversationLog {
    max_lines: usize,
    entries: Mutex<HashMap<UserKey, VecDeque<String>>>,
}

impl ConversationLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Append a raw line to a user's history, creating it on first use.
    pub fn append(&self, key: &UserKey, line: impl Into<String>) {
        let mut entries = self.entries.lock();
        let lines = entries.entry(key.clone()).or_default();
        lines.push_back(line.into());
        while lines.len() > self.max_lines {
            lines.pop_front();
        }
    }

    pub fn append_user(&self, key: &UserKey, text: &str) {
        self.append(key, format!("User: {}\n", text));
    }

    pub fn append_bot(&self, key: &UserKey, text: &str) {
        self.append(key, format!("Bot: {}\n", text));
    }

    /// Join a user's history with `\n`. With `exclude_last` the most recent
    /// line is omitted: the message being processed is not yet "history".
    /// Unknown keys render as the empty string.
    pub fn render_context(&self, key: &UserKey, exclude_last: bool) -> String {
        let entries = self.entries.lock();
        let Some(lines) = entries.get(key) else {
            return String::new();
        };
        let take = if exclude_last {
            lines.len().saturating_sub(1)
        } else {
            lines.len()
        };
        lines
            .iter()
            .take(take)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn line_count(&self, key: &UserKey) -> usize {
        self.entries.lock().get(key).map_or(0, |l| l.len())
    }
}
