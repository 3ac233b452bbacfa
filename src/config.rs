//! Configuration management

use anyhow::Result;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Webhook verification token (WhatsApp Cloud API handshake)
    pub verify_token: String,

    /// Bearer token for the fact-check service
    pub factiverse_token: String,

    /// Fact-check service base URL
    pub factiverse_base_url: String,

    /// WhatsApp Cloud API access token (adapter disabled when absent)
    pub whatsapp_token: Option<String>,

    /// WhatsApp phone number id for the send endpoint
    pub whatsapp_phone_number_id: Option<String>,

    /// Graph API base URL
    pub graph_base_url: String,

    /// Telegram bot token (adapter disabled when absent)
    pub telegram_token: Option<String>,

    /// Telegram API base URL
    pub telegram_base_url: String,

    /// Timeout for outbound HTTP calls, seconds
    pub request_timeout_secs: u64,

    /// Minimum claim-detection confidence
    pub claim_score_threshold: f64,

    /// Word count at which a message skips intent classification
    pub long_message_words: usize,

    /// Conversation lines retained per user
    pub context_max_lines: usize,

    /// Reply-routing table capacity (entries)
    pub routing_capacity: u64,

    /// Reply-routing entry TTL, seconds
    pub routing_ttl_secs: u64,

    /// SQLite path for the feedback table
    pub feedback_db_path: PathBuf,

    /// OCR binary invoked for image text extraction
    pub tesseract_bin: String,

    /// HTTP listen address
    pub bind_addr: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let verify_token = std::env::var("VERIFY_TOKEN")
            .map_err(|_| anyhow::anyhow!("VERIFY_TOKEN not set"))?;
        let factiverse_token = std::env::var("FACTIVERSE_API_TOKEN")
            .map_err(|_| anyhow::anyhow!("FACTIVERSE_API_TOKEN not set"))?;

        let factiverse_base_url = std::env::var("FACTIVERSE_API_URL")
            .unwrap_or_else(|_| "https://dev.factiverse.ai/v1".to_string());

        let whatsapp_token = std::env::var("WHATSAPP_TOKEN").ok();
        let whatsapp_phone_number_id = std::env::var("PHONE_NUMBER_ID").ok();
        let graph_base_url = std::env::var("GRAPH_API_URL")
            .unwrap_or_else(|_| "https://graph.facebook.com/v22.0".to_string());

        let telegram_token = std::env::var("TELEGRAM_TOKEN").ok();
        let telegram_base_url = std::env::var("TELEGRAM_API_URL")
            .unwrap_or_else(|_| "https://api.telegram.org".to_string());

        let request_timeout_secs = env_parse("REQUEST_TIMEOUT_SECS", 30);
        let claim_score_threshold = env_parse("CLAIM_SCORE_THRESHOLD", 0.75);
        let long_message_words = env_parse("LONG_MESSAGE_WORDS", 100);
        let context_max_lines = env_parse("CONTEXT_MAX_LINES", 50);
        let routing_capacity = env_parse("ROUTING_CAPACITY", 10_000);
        let routing_ttl_secs = env_parse("ROUTING_TTL_SECS", 24 * 60 * 60);

        let feedback_db_path = std::env::var("FEEDBACK_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data").join("factibot.db"));

        let tesseract_bin =
            std::env::var("TESSERACT_BIN").unwrap_or_else(|_| "tesseract".to_string());

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self {
            verify_token,
            factiverse_token,
            factiverse_base_url,
            whatsapp_token,
            whatsapp_phone_number_id,
            graph_base_url,
            telegram_token,
            telegram_base_url,
            request_timeout_secs,
            claim_score_threshold,
            long_message_words,
            context_max_lines,
            routing_capacity,
            routing_ttl_secs,
            feedback_db_path,
            tesseract_bin,
            bind_addr,
        })
    }

    /// Minimal config with no platform credentials; used by tests.
    pub fn for_tests() -> Self {
        Self {
            verify_token: "test-verify-token".to_string(),
            factiverse_token: "test-api-token".to_string(),
            factiverse_base_url: "http://localhost:0/v1".to_string(),
            whatsapp_token: None,
            whatsapp_phone_number_id: None,
            graph_base_url: "http://localhost:0".to_string(),
            telegram_token: None,
            telegram_base_url: "http://localhost:0".to_string(),
            request_timeout_secs: 5,
            claim_score_threshold: 0.75,
            long_message_words: 100,
            context_max_lines: 50,
            routing_capacity: 1_000,
            routing_ttl_secs: 3_600,
            feedback_db_path: std::env::temp_dir().join("factibot_test.db"),
            tesseract_bin: "tesseract".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
