//! Prompt templates for the generation endpoint.
//!
//! User-supplied fields are embedded in JSON-bearing prompts, so double
//! quotes are swapped out before formatting.

fn sanitize(s: &str) -> String {
    s.replace('"', "'")
}

/// Classification prompt. The model must answer with a bare JSON object.
pub fn intent_detection(message: &str, context: &str) -> String {
    format!(
        "Classify the user's message into an intent.\n\
         Conversation so far:\n{context}\n\n\
         Message: {message}\n\n\
         Respond with only a JSON object, no prose:\n\
         {{\"intent_type\": \"fact_check\" | \"general\", \
         \"split_claims\": [\"<claim>\", ...]}}\n\
         Use \"fact_check\" when the message asserts something verifiable and \
         list each independently checkable claim in split_claims. Use \
         \"general\" for greetings, questions about the bot, or chit-chat.",
        context = sanitize(context),
        message = sanitize(message),
    )
}

/// Response prompt when cleaned evidence is available.
pub fn claims_response(lang: &str, message: &str, context: &str) -> String {
    format!(
        "You are a fact-checking assistant. Reply in language '{lang}'.\n\
         Conversation so far:\n{context}\n\n\
         The user said: {message}\n\n\
         The attached text is a JSON list of verdicts with supporting and \
         refuting evidence. For every claim state the verdict with its \
         confidence, then summarize up to 3 evidence sources with their URLs. \
         Keep it short, neutral, and end on an encouraging note.",
        lang = lang,
        context = sanitize(context),
        message = sanitize(message),
    )
}

/// Response prompt when no checkable claims were found.
pub fn no_claims_response(lang: &str, message: &str, context: &str) -> String {
    format!(
        "You are a fact-checking assistant. Reply in language '{lang}'.\n\
         Conversation so far:\n{context}\n\n\
         The user said: {message}\n\n\
         No verifiable claims were found in the message. Explain briefly that \
         you check factual statements, and invite the user to phrase one.",
        lang = lang,
        context = sanitize(context),
        message = sanitize(message),
    )
}

/// General conversation prompt (no evidence).
pub fn general(message: &str, context: &str) -> String {
    format!(
        "You are a friendly fact-checking assistant.\n\
         Conversation so far:\n{context}\n\n\
         The user said: {message}\n\n\
         Answer conversationally in one or two short paragraphs. If the user \
         seems to want something checked, ask them for a concrete claim.",
        context = sanitize(context),
        message = sanitize(message),
    )
}

/// Suggestion prompt; the reply must use one `Claim N:` line per suggestion.
pub fn claim_suggestion(message: &str, context: &str) -> String {
    format!(
        "The user's message could not be matched to checkable evidence.\n\
         Conversation so far:\n{context}\n\n\
         Message: {message}\n\n\
         Propose up to 3 short, independently verifiable rephrasings of what \
         the user might want checked. Start with one inviting sentence, then \
         list each suggestion on its own line in exactly this form:\n\
         Claim 1: <text>\nClaim 2: <text>\nClaim 3: <text>",
        context = sanitize(context),
        message = sanitize(message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_sanitized() {
        let p = claims_response("en", "he said \"hello\"", "Bot: \"hi\"\n");
        assert!(!p.contains("\"hello\""));
        assert!(p.contains("'hello'"));
        assert!(p.contains("'hi'"));
    }

    #[test]
    fn test_suggestion_prompt_names_format() {
        let p = claim_suggestion("vaccines", "");
        assert!(p.contains("Claim 1:"));
        assert!(p.contains("Claim 3:"));
    }

    #[test]
    fn test_intent_prompt_demands_json() {
        let p = intent_detection("the earth is flat", "");
        assert!(p.contains("intent_type"));
        assert!(p.contains("split_claims"));
    }
}
