//! Feedback Store
//!
//! Persists emoji reactions and numeric ratings on bot responses. Writes are
//! tiny and rare, so a single connection behind a lock is enough.

use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One reaction or rating, attributed to the bot text it targeted.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackEntry {
    pub emoji: String,
    pub message_text: String,
    pub timestamp: i64,
}

/// SQLite-backed feedback table.
pub struct FeedbackStore {
    conn: Mutex<Connection>,
}

impl FeedbackStore {
    /// Open or create the feedback database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                emoji TEXT,
                message_text TEXT,
                timestamp INTEGER
            );
            "#,
        )?;

        info!("feedback store opened: {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record one piece of feedback. `emoji` carries either the reaction
    /// emoji or the rating digit.
    pub fn insert(&self, emoji: &str, message_text: &str) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp();
        self.conn.lock().execute(
            "INSERT INTO feedback (emoji, message_text, timestamp) VALUES (?1, ?2, ?3)",
            params![emoji, message_text, timestamp],
        )?;
        Ok(())
    }

    /// All recorded feedback, oldest first.
    pub fn all(&self) -> Result<Vec<FeedbackEntry>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT emoji, message_text, timestamp FROM feedback ORDER BY timestamp")?;

        let entries = stmt
            .query_map([], |row| {
                Ok(FeedbackEntry {
                    emoji: row.get(0)?,
                    message_text: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }
}
