//! Inbound text canonicalization.
//!
//! Platform clients deliver typographic Unicode (curly quotes, em dashes,
//! non-breaking spaces) that breaks downstream JSON-embedding in generation
//! prompts. Everything is flattened to ASCII equivalents before any other
//! processing sees the text.

use unicode_normalization::UnicodeNormalization;

/// Typographic characters and their ASCII stand-ins.
const REPLACEMENTS: &[(char, &str)] = &[
    ('\u{00a0}', " "),   // non-breaking space
    ('\u{2018}', "'"),   // left single quote
    ('\u{2019}', "'"),   // right single quote
    ('\u{201c}', "\""),  // left double quote
    ('\u{201d}', "\""),  // right double quote
    ('\u{2013}', "-"),   // en dash
    ('\u{2014}', "--"),  // em dash
    ('\u{2026}', "..."), // ellipsis
];

/// Canonicalize raw platform text: NFKD, double quotes to single quotes,
/// typographic substitutions, trim. Total over any input, no side effects.
pub fn normalize_message(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.nfkd() {
        if ch == '"' {
            out.push('\'');
            continue;
        }
        match REPLACEMENTS.iter().find(|(c, _)| *c == ch) {
            Some((_, replacement)) => out.push_str(replacement),
            None => out.push(ch),
        }
    }
    out.trim().to_string()
}
