//! Claim/Intent Dispatcher
//!
//! Decides per inbound text whether to fact-check a URL, fact-check detected
//! claims, offer claim suggestions, or answer conversationally, and drives
//! the external calls for that choice. Stance detection over multiple claims
//! fans out concurrently; a single failed call drops only that claim's
//! evidence, never the whole turn. Every failure path ends in the fixed
//! apology reply, since the webhook has already been acknowledged by then.

use crate::channels::Button;
use crate::evidence::{clean_facts, evidence_to_json, ClaimVerdict};
use crate::factiverse::{detect_lang, FactService};
use crate::feedback::FeedbackStore;
use crate::intent::{detect_intent, Intent};
use crate::prompts;
use crate::routing::ReplyRouter;
use futures_util::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{error, info, warn};

/// User-visible fallback for any failed turn.
pub const APOLOGY: &str = "⚠️ Temporary service issue. Please try again!";

const MAX_SUGGESTIONS: usize = 3;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static SUGGESTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Claim \d+:\s*(.+)$").unwrap());

/// What a turn produced, ready for a platform adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Reply(String),
    Suggestions { text: String, buttons: Vec<Button> },
}

impl Outcome {
    /// The text tracked in context and reply routing.
    pub fn text(&self) -> &str {
        match self {
            Outcome::Reply(text) => text,
            Outcome::Suggestions { text, .. } => text,
        }
    }
}

/// Turn-level decision logic over the external service.
pub struct Dispatcher {
    svc: Arc<dyn FactService>,
    routes: Arc<ReplyRouter>,
    feedback: Arc<FeedbackStore>,
    long_message_words: usize,
}

impl Dispatcher {
    pub fn new(
        svc: Arc<dyn FactService>,
        routes: Arc<ReplyRouter>,
        feedback: Arc<FeedbackStore>,
        long_message_words: usize,
    ) -> Self {
        Self {
            svc,
            routes,
            feedback,
            long_message_words,
        }
    }

    /// Handle one normalized text message with its rendered context.
    pub async fn handle_text(&self, message: &str, context: &str) -> Outcome {
        if let Some(url) = URL_RE.find(message) {
            // Only the first URL is checked; the rest are ignored.
            return self.check_url(url.as_str(), message, context).await;
        }

        let word_count = message.split_whitespace().count();
        if word_count >= self.long_message_words {
            // Long texts skip intent classification and go straight to
            // claim detection.
            let claims = self.svc.detect_claims(message).await;
            if claims.is_empty() {
                return self.general_reply(message, context).await;
            }
            return self.check_claims(&claims, message, context).await;
        }

        match detect_intent(self.svc.as_ref(), message, context).await {
            Intent::FactCheck { claims } => self.check_claims(&claims, message, context).await,
            Intent::General => self.general_reply(message, context).await,
            Intent::Unknown => self.suggest_claims(message, context).await,
        }
    }

    /// Handle a tapped claim-suggestion button.
    pub async fn handle_claim(&self, claim: &str, context: &str) -> Outcome {
        info!(claim, "processing selected claim");
        self.check_claims(&[claim.to_string()], claim, context).await
    }

    /// Record a 👍/👎 reaction against the bot text it targeted.
    pub fn handle_reaction(&self, emoji: &str, target_text: &str) {
        if let Err(e) = self.feedback.insert(emoji, target_text) {
            error!(error = %e, "failed to store reaction");
        }
    }

    /// Record a 1-6 rating.
    pub fn handle_rating(&self, value: &str, label: &str) {
        if let Err(e) = self.feedback.insert(value, label) {
            error!(error = %e, "failed to store rating");
        }
    }

    async fn check_url(&self, url: &str, message: &str, context: &str) -> Outcome {
        let verdicts = match self.svc.fact_check(&[], url).await {
            Ok(raw) => clean_facts(&raw),
            Err(e) => {
                error!(url, error = %e, "url fact check failed");
                return Outcome::Reply(APOLOGY.to_string());
            }
        };

        if verdicts.is_empty() {
            return self.suggest_claims(message, context).await;
        }
        self.generate_from_evidence(&verdicts, message, context).await
    }

    async fn check_claims(&self, claims: &[String], message: &str, context: &str) -> Outcome {
        let verdicts = self.gather_stances(claims).await;
        if verdicts.is_empty() {
            return self.suggest_claims(message, context).await;
        }
        self.generate_from_evidence(&verdicts, message, context).await
    }

    /// One stance-detection call per claim, concurrently, wait-for-all.
    /// A failed call is logged and its claim omitted; the batch proceeds
    /// with whatever evidence succeeded.
    async fn gather_stances(&self, claims: &[String]) -> Vec<ClaimVerdict> {
        info!(count = claims.len(), "checking claims");

        let calls = claims.iter().map(|claim| async move {
            match self.svc.stance_detection(claim).await {
                Ok(raw) => clean_facts(&raw),
                Err(e) => {
                    error!(claim = %claim, error = %e, "stance detection failed, omitting claim");
                    Vec::new()
                }
            }
        });

        join_all(calls).await.into_iter().flatten().collect()
    }

    async fn generate_from_evidence(
        &self,
        verdicts: &[ClaimVerdict],
        message: &str,
        context: &str,
    ) -> Outcome {
        let lang = verdicts
            .first()
            .map(|v| detect_lang(&v.claim))
            .unwrap_or_else(|| "en".to_string());
        let prompt = prompts::claims_response(&lang, message, context);

        match self.svc.generate(&prompt, &evidence_to_json(verdicts)).await {
            Ok(response) => Outcome::Reply(response),
            Err(e) => {
                error!(error = %e, "response generation failed");
                Outcome::Reply(APOLOGY.to_string())
            }
        }
    }

    async fn general_reply(&self, message: &str, context: &str) -> Outcome {
        match self
            .svc
            .generate(&prompts::general(message, context), message)
            .await
        {
            Ok(response) => Outcome::Reply(response),
            Err(e) => {
                error!(error = %e, "general reply generation failed");
                Outcome::Reply(APOLOGY.to_string())
            }
        }
    }

    /// Ask the generator for up to 3 claim rephrasings and register a button
    /// for each so a later tap resolves back to its claim.
    async fn suggest_claims(&self, message: &str, context: &str) -> Outcome {
        let raw = match self
            .svc
            .generate(&prompts::claim_suggestion(message, context), message)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "claim suggestion generation failed");
                return Outcome::Reply(APOLOGY.to_string());
            }
        };

        let claims = parse_suggestions(&raw);
        if claims.is_empty() {
            warn!("no suggestions parsed from generator output");
            return Outcome::Reply(raw);
        }

        let mut buttons = Vec::new();
        for (idx, claim) in claims.iter().take(MAX_SUGGESTIONS).enumerate() {
            let id = ReplyRouter::new_button_id();
            self.routes.record_claim_button(&id, claim).await;
            buttons.push(Button::new(id, format!("Claim {}", idx + 1)));
        }

        Outcome::Suggestions { text: raw, buttons }
    }
}

/// Pull `Claim N: ...` lines out of the generator's suggestion output.
fn parse_suggestions(response: &str) -> Vec<String> {
    SUGGESTION_RE
        .captures_iter(response)
        .map(|c| c[1].trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
