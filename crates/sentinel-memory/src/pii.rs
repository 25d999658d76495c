//! PII redaction for memory-node metadata and search output.
//!
//! Redaction walks every JSON string leaf and replaces recognized patterns
//! (email, SSN, card number, phone) with fixed tokens. Running redaction
//! twice over the same value is a no-op: the tokens themselves never match
//! any of the patterns.

use regex::Regex;
use sentinel_types::JsonValue;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap())
}

fn ssn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap())
}

fn card_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:\d[ -]?){13,19}\b").unwrap())
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:\+?1[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b").unwrap())
}

/// Redact recognized PII patterns out of a single string.
pub fn redact_text(input: &str) -> String {
    let step = email_re().replace_all(input, "[REDACTED_EMAIL]");
    let step = ssn_re().replace_all(&step, "[REDACTED_SSN]");
    let step = card_re().replace_all(&step, "[REDACTED_CARD]");
    let step = phone_re().replace_all(&step, "[REDACTED_PHONE]");
    step.into_owned()
}

/// Recursively redact every string leaf of a `JsonValue` tree.
pub fn redact_json(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(redact_text(s)),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(redact_json).collect()),
        JsonValue::Object(map) => {
            JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), redact_json(v))).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_email_and_ssn() {
        let out = redact_text("contact alice@example.com, ssn 123-45-6789");
        assert!(out.contains("[REDACTED_EMAIL]"));
        assert!(out.contains("[REDACTED_SSN]"));
        assert!(!out.contains("alice@example.com"));
    }

    #[test]
    fn redaction_is_idempotent() {
        let once = redact_text("alice@example.com 123-45-6789");
        let twice = redact_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn redacts_nested_json_strings_only() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("email".to_string(), JsonValue::String("bob@example.com".to_string()));
        map.insert("age".to_string(), JsonValue::Number(30i64.into()));
        let redacted = redact_json(&JsonValue::Object(map));
        assert_eq!(
            redacted.get("email"),
            Some(&JsonValue::String("[REDACTED_EMAIL]".to_string()))
        );
        assert_eq!(redacted.get("age"), Some(&JsonValue::Number(30i64.into())));
    }
}
