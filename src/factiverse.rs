//! Fact-check service client
//!
//! HTTP client for the claim detection, stance detection, fact-check and
//! generation endpoints. All calls carry a bounded timeout; 5xx and connect
//! failures are retried with exponential backoff, 4xx fails immediately.
//! `detect_claims` degrades to an empty list on any error so a flaky
//! detection call never takes down a whole turn.

use crate::config::Config;
use crate::error::ApiError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;

/// Seam to the external fact-check / generation service. The dispatcher only
/// sees this trait, so tests can substitute a scripted implementation.
#[async_trait]
pub trait FactService: Send + Sync {
    /// Free-text generation. Returns the model output.
    async fn generate(&self, prompt: &str, text: &str) -> Result<String, ApiError>;

    /// Stance detection for a single claim. Returns the raw service JSON.
    async fn stance_detection(&self, claim: &str) -> Result<Value, ApiError>;

    /// Fact-check claims, optionally scoped to a source URL.
    async fn fact_check(&self, claims: &[String], url: &str) -> Result<Value, ApiError>;

    /// Detect checkable claims in free text. Empty on error.
    async fn detect_claims(&self, text: &str) -> Vec<String>;
}

/// Production client for the Factiverse API.
pub struct FactiverseClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    claim_score_threshold: f64,
}

impl FactiverseClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.factiverse_base_url.trim_end_matches('/').to_string(),
            token: config.factiverse_token.clone(),
            claim_score_threshold: config.claim_score_threshold,
        }
    }

    /// POST with retry. 5xx and transport failures back off exponentially;
    /// anything else is returned to the caller as-is.
    async fn post_json(&self, endpoint: &str, payload: &Value) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut delay = Duration::from_secs(1);

        for attempt in 0..=MAX_RETRIES {
            let sent = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(payload)
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<Value>().await.map_err(ApiError::from);
                    }

                    let body = response.text().await.unwrap_or_default();
                    if status.is_server_error() && attempt < MAX_RETRIES {
                        warn!(endpoint, %status, attempt, "service error, retrying");
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < MAX_RETRIES => {
                    warn!(endpoint, error = %e, attempt, "connection error, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ApiError::Transport("retries exhausted".to_string()))
    }
}

#[async_trait]
impl FactService for FactiverseClient {
    async fn generate(&self, prompt: &str, text: &str) -> Result<String, ApiError> {
        let payload = json!({
            "logging": false,
            "text": text,
            "prompt": prompt,
        });

        let response = self.post_json("generate", &payload).await?;
        let output = response
            .get("full_output")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("generate response missing full_output".into()))?;

        Ok(output.replace("**", "*"))
    }

    async fn stance_detection(&self, claim: &str) -> Result<Value, ApiError> {
        let payload = json!({
            "logging": false,
            "claim": claim,
        });
        self.post_json("stance_detection", &payload).await
    }

    async fn fact_check(&self, claims: &[String], url: &str) -> Result<Value, ApiError> {
        let lang = claims
            .first()
            .map(|c| detect_lang(c))
            .unwrap_or_else(|| "en".to_string());

        let payload = json!({
            "logging": false,
            "text": "",
            "claims": claims,
            "url": url,
            "lang": lang,
        });
        self.post_json("fact_check", &payload).await
    }

    async fn detect_claims(&self, text: &str) -> Vec<String> {
        let payload = json!({
            "logging": false,
            "lang": detect_lang(text),
            "text": text,
            "claimScoreThreshold": self.claim_score_threshold,
        });

        let response = match self.post_json("claim_detection", &payload).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "claim detection failed, continuing without claims");
                return Vec::new();
            }
        };

        let claims = extract_detected_claims(&response);
        debug!(count = claims.len(), "claims detected");
        claims
    }
}

/// Best-effort language code for API payloads; `en` when undetectable.
pub fn detect_lang(text: &str) -> String {
    whatlang::detect(text)
        .filter(|info| info.is_reliable())
        .map(|info| info.lang().code().to_string())
        .unwrap_or_else(|| "en".to_string())
}

fn extract_detected_claims(response: &Value) -> Vec<String> {
    response
        .get("detectedClaims")
        .and_then(Value::as_array)
        .map(|claims| {
            claims
                .iter()
                .filter_map(|c| c.get("claim").and_then(Value::as_str))
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
