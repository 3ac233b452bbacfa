//! Intent classification
//!
//! Short messages are routed through a generation call that classifies them.
//! The classifier returns JSON in the good case; malformed output is common
//! enough that recovery is part of the contract: a Python-style dict is
//! repaired first, and anything still unparseable falls back to treating the
//! whole message as a single fact-check claim.

use crate::factiverse::FactService;
use crate::prompts;
use serde_json::Value;
use tracing::warn;

/// Per-message classification. Never persisted beyond the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Verifiable statements; each entry is checked independently.
    FactCheck { claims: Vec<String> },
    /// Greeting / chit-chat / question about the bot.
    General,
    /// Classifier produced a type this code does not know.
    Unknown,
}

/// Classify a message. Degrades to the fact-check fallback on any failure.
pub async fn detect_intent(svc: &dyn FactService, message: &str, context: &str) -> Intent {
    let prompt = prompts::intent_detection(message, context);
    match svc.generate(&prompt, message).await {
        Ok(raw) => parse_intent(&raw, message),
        Err(e) => {
            warn!(error = %e, "intent classification call failed, falling back");
            fallback(message)
        }
    }
}

/// Parse the classifier output. Exposed separately so the recovery paths are
/// testable without a service.
pub fn parse_intent(raw: &str, message: &str) -> Intent {
    let data = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(v) => v,
        Err(_) => {
            // Single-quoted dicts with None/True/False show up regularly.
            let repaired = raw
                .replace('\'', "\"")
                .replace("None", "null")
                .replace("True", "true")
                .replace("False", "false");
            match serde_json::from_str::<Value>(repaired.trim()) {
                Ok(v) => v,
                Err(_) => {
                    warn!(raw, "unparseable classifier output, falling back");
                    return fallback(message);
                }
            }
        }
    };

    match data.get("intent_type").and_then(Value::as_str) {
        Some("general") => Intent::General,
        Some("fact_check") | Some("fact_check_request") => {
            let claims = data
                .get("split_claims")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| vec![message.to_string()]);
            Intent::FactCheck { claims }
        }
        Some(_) => Intent::Unknown,
        None => fallback(message),
    }
}

fn fallback(message: &str) -> Intent {
    Intent::FactCheck {
        claims: vec![message.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_fact_check() {
        let raw = r#"{"intent_type": "fact_check", "split_claims": ["a", "b"]}"#;
        assert_eq!(
            parse_intent(raw, "msg"),
            Intent::FactCheck {
                claims: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_fact_check_without_claims_uses_message() {
        let raw = r#"{"intent_type": "fact_check"}"#;
        assert_eq!(
            parse_intent(raw, "whole message"),
            Intent::FactCheck {
                claims: vec!["whole message".to_string()]
            }
        );
    }

    #[test]
    fn test_general() {
        assert_eq!(parse_intent(r#"{"intent_type": "general"}"#, "hi"), Intent::General);
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            parse_intent(r#"{"intent_type": "source_request"}"#, "m"),
            Intent::Unknown
        );
    }

    #[test]
    fn test_python_dict_repaired() {
        let raw = "{'intent_type': 'fact_check', 'split_claims': None}";
        assert_eq!(
            parse_intent(raw, "msg"),
            Intent::FactCheck {
                claims: vec!["msg".to_string()]
            }
        );
    }

    #[test]
    fn test_garbage_falls_back_to_fact_check() {
        assert_eq!(
            parse_intent("not json", "the earth is flat"),
            Intent::FactCheck {
                claims: vec!["the earth is flat".to_string()]
            }
        );
    }

    #[test]
    fn test_json_without_intent_type_falls_back() {
        assert_eq!(
            parse_intent(r#"{"confidence": 0.9}"#, "m"),
            Intent::FactCheck {
                claims: vec!["m".to_string()]
            }
        );
    }
}
