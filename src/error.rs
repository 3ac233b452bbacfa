//! Error types for external collaborators.
//!
//! Every failure along a webhook turn ends in a logged error and a
//! best-effort user-visible message; nothing here is fatal to the process.

use thiserror::Error;

/// Errors from the fact-check / generation service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response shape: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Parse(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Errors from the messaging platform APIs.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("platform returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no message id in platform response")]
    MissingMessageId,

    #[error("media fetch failed: {0}")]
    MediaFailed(String),
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        ChannelError::SendFailed(e.to_string())
    }
}
