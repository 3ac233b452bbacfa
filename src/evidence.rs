//! Evidence reshaping
//!
//! The fact-check service returns two response shapes: stance detection
//! (`collection: "stance_detection"`, one claim at the top level) and batch
//! fact-check (a list of claims). Both are reduced here to the compact
//! verdict structure embedded in generation prompts. Anything malformed is
//! skipped, never fatal.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

const SNIPPET_MAX_CHARS: usize = 1000;
const MIN_SIM_SCORE: f64 = 0.5;

/// One source snippet supporting or refuting a claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceItem {
    #[serde(rename = "labelDescription")]
    pub label: String,
    pub domain_name: String,
    #[serde(rename = "domainReliability")]
    pub domain_reliability: String,
    pub url: String,
    #[serde(rename = "evidenceSnippet")]
    pub snippet: String,
}

/// Cleaned verdict for a single claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimVerdict {
    pub claim: String,
    pub verdict: String,
    pub confidence_percentage: f64,
    pub summary: String,
    pub fix: String,
    pub supporting_evidence: Vec<EvidenceItem>,
    pub refuting_evidence: Vec<EvidenceItem>,
}

/// Reduce a raw service response to cleaned verdicts. Claims without any
/// evidence are dropped; evidence labels other than SUPPORTS/REFUTES are
/// ignored.
pub fn clean_facts(raw: &Value) -> Vec<ClaimVerdict> {
    let items: Vec<&Value> = if raw
        .get("collection")
        .and_then(Value::as_str)
        == Some("stance_detection")
    {
        vec![raw]
    } else {
        raw.get("claims")
            .or_else(|| raw.get("text"))
            .and_then(Value::as_array)
            .map(|a| a.iter().collect())
            .unwrap_or_default()
    };

    let mut cleaned = Vec::new();

    for item in items {
        let evidence_list = match item.get("evidence").and_then(Value::as_array) {
            Some(list) if !list.is_empty() => list,
            _ => continue,
        };

        let claim = sanitize(item.get("claim").and_then(Value::as_str).unwrap_or(""));
        let summary = flatten_summary(item.get("summary"));
        let fix = sanitize(item.get("fix").and_then(Value::as_str).unwrap_or(""));

        let (verdict, confidence_percentage) = verdict_of(item);

        let mut supporting_evidence = Vec::new();
        let mut refuting_evidence = Vec::new();

        for evidence in evidence_list {
            let label = evidence
                .get("labelDescription")
                .and_then(Value::as_str)
                .unwrap_or("");
            if label != "SUPPORTS" && label != "REFUTES" {
                continue;
            }

            let sim_score = evidence
                .get("simScore")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let snippet = if sim_score > MIN_SIM_SCORE {
                truncate_snippet(
                    evidence
                        .get("evidenceSnippet")
                        .and_then(Value::as_str)
                        .unwrap_or(""),
                )
            } else {
                String::new()
            };

            let entry = EvidenceItem {
                label: label.to_string(),
                domain_name: evidence
                    .get("domainName")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                domain_reliability: evidence
                    .get("domain_reliability")
                    .and_then(|r| r.get("Reliability"))
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string(),
                url: evidence
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                snippet,
            };

            if label == "SUPPORTS" {
                supporting_evidence.push(entry);
            } else {
                refuting_evidence.push(entry);
            }
        }

        cleaned.push(ClaimVerdict {
            claim,
            verdict,
            confidence_percentage,
            summary,
            fix,
            supporting_evidence,
            refuting_evidence,
        });
    }

    debug!(verdicts = cleaned.len(), "cleaned fact-check response");
    cleaned
}

/// Serialize cleaned verdicts to the JSON string handed to generation.
pub fn evidence_to_json(verdicts: &[ClaimVerdict]) -> String {
    serde_json::to_string(verdicts).unwrap_or_else(|_| "[]".to_string())
}

/// Map `finalPrediction` / `finalScore` to a verdict and a confidence
/// percentage. Prediction 0 means the claim is incorrect and confidence is
/// taken from the inverted score; absence means the service is uncertain.
fn verdict_of(item: &Value) -> (String, f64) {
    let score = item
        .get("finalScore")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    match item.get("finalPrediction").and_then(Value::as_i64) {
        Some(0) => ("Incorrect".to_string(), round2((1.0 - score) * 100.0)),
        Some(_) => ("Correct".to_string(), round2(score * 100.0)),
        None => ("Uncertain".to_string(), round2(score * 100.0)),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn sanitize(s: &str) -> String {
    s.replace('"', "'")
}

/// Summaries arrive as either a string or a list of strings.
fn flatten_summary(summary: Option<&Value>) -> String {
    match summary {
        Some(Value::String(s)) => sanitize(s),
        Some(Value::Array(parts)) => sanitize(
            &parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => String::new(),
    }
}

fn truncate_snippet(snippet: &str) -> String {
    let sanitized = sanitize(snippet);
    if sanitized.chars().count() > SNIPPET_MAX_CHARS {
        let mut truncated: String = sanitized.chars().take(SNIPPET_MAX_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stance_payload() -> Value {
        json!({
            "collection": "stance_detection",
            "claim": "The moon is made of cheese",
            "finalPrediction": 0,
            "finalScore": 0.1,
            "summary": "No dairy detected.",
            "fix": "The moon is made of rock.",
            "evidence": [
                {
                    "labelDescription": "REFUTES",
                    "domainName": "nasa.gov",
                    "domain_reliability": {"Reliability": "High"},
                    "url": "https://nasa.gov/moon",
                    "evidenceSnippet": "Lunar samples are basaltic rock.",
                    "simScore": 0.9
                },
                {
                    "labelDescription": "NOT_ENOUGH_INFO",
                    "url": "https://example.com"
                }
            ]
        })
    }

    #[test]
    fn test_stance_shape_single_claim() {
        let verdicts = clean_facts(&stance_payload());
        assert_eq!(verdicts.len(), 1);
        let v = &verdicts[0];
        assert_eq!(v.claim, "The moon is made of cheese");
        assert_eq!(v.verdict, "Incorrect");
        assert_eq!(v.confidence_percentage, 90.0);
        assert_eq!(v.refuting_evidence.len(), 1);
        assert!(v.supporting_evidence.is_empty());
        assert_eq!(v.refuting_evidence[0].domain_reliability, "High");
    }

    #[test]
    fn test_batch_shape_under_claims_key() {
        let payload = json!({
            "claims": [
                {
                    "claim": "Water boils at 100C",
                    "finalPrediction": 1,
                    "finalScore": 0.95,
                    "evidence": [
                        {
                            "labelDescription": "SUPPORTS",
                            "domainName": "britannica.com",
                            "url": "https://britannica.com/boiling",
                            "evidenceSnippet": "At sea level water boils at 100C.",
                            "simScore": 0.8
                        }
                    ]
                }
            ]
        });

        let verdicts = clean_facts(&payload);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].verdict, "Correct");
        assert_eq!(verdicts[0].confidence_percentage, 95.0);
        assert_eq!(verdicts[0].supporting_evidence.len(), 1);
    }

    #[test]
    fn test_claim_without_evidence_dropped() {
        let payload = json!({
            "claims": [
                {"claim": "Nothing to see", "evidence": []},
                {"claim": "Also nothing"}
            ]
        });
        assert!(clean_facts(&payload).is_empty());
    }

    #[test]
    fn test_missing_prediction_is_uncertain() {
        let payload = json!({
            "claims": [
                {
                    "claim": "Maybe",
                    "evidence": [
                        {"labelDescription": "SUPPORTS", "url": "", "simScore": 0.6, "evidenceSnippet": "x"}
                    ]
                }
            ]
        });
        assert_eq!(clean_facts(&payload)[0].verdict, "Uncertain");
    }

    #[test]
    fn test_low_similarity_snippet_omitted() {
        let payload = json!({
            "claims": [
                {
                    "claim": "c",
                    "evidence": [
                        {"labelDescription": "SUPPORTS", "url": "", "simScore": 0.2, "evidenceSnippet": "should vanish"}
                    ]
                }
            ]
        });
        assert_eq!(clean_facts(&payload)[0].supporting_evidence[0].snippet, "");
    }

    #[test]
    fn test_long_snippet_truncated() {
        let long = "x".repeat(1500);
        let payload = json!({
            "claims": [
                {
                    "claim": "c",
                    "evidence": [
                        {"labelDescription": "REFUTES", "url": "", "simScore": 0.9, "evidenceSnippet": long}
                    ]
                }
            ]
        });
        let snippet = &clean_facts(&payload)[0].refuting_evidence[0].snippet;
        assert_eq!(snippet.chars().count(), 1003);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_quotes_swapped_in_claim_and_snippet() {
        let payload = json!({
            "claims": [
                {
                    "claim": "He said \"no\"",
                    "evidence": [
                        {"labelDescription": "SUPPORTS", "url": "", "simScore": 0.9, "evidenceSnippet": "quote: \"no\""}
                    ]
                }
            ]
        });
        let v = &clean_facts(&payload)[0];
        assert_eq!(v.claim, "He said 'no'");
        assert_eq!(v.supporting_evidence[0].snippet, "quote: 'no'");
    }

    #[test]
    fn test_summary_list_flattened() {
        let mut payload = stance_payload();
        payload["summary"] = json!(["part one", "part two"]);
        assert_eq!(clean_facts(&payload)[0].summary, "part one part two");
    }

    #[test]
    fn test_null_and_garbage_input() {
        assert!(clean_facts(&Value::Null).is_empty());
        assert!(clean_facts(&json!({"text": null})).is_empty());
        assert!(clean_facts(&json!("not an object")).is_empty());
    }

    #[test]
    fn test_evidence_to_json_empty() {
        assert_eq!(evidence_to_json(&[]), "[]");
    }
}
