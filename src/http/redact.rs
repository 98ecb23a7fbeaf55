//! # Log Redaction
//!
//! Pure copies of headers and JSON bodies with sensitive values replaced
//! before anything reaches a log sink. The on-the-wire request is never
//! touched.

use std::collections::BTreeMap;

use reqwest::header::HeaderMap;
use serde_json::Value;

/// Sentinel substituted for every sensitive value.
pub const MASK: &str = "***MASKED***";

const SENSITIVE_FRAGMENTS: [&str; 5] =
    ["authorization", "token", "password", "api_key", "secret"];

/// A key is sensitive when its lowercased form contains any known fragment.
/// Hyphens normalize to underscores first so HTTP header spellings
/// (`X-Api-Key`) match the same fragments as body field names (`api_key`).
pub fn is_sensitive(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase().replace('-', "_");
    SENSITIVE_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

/// Redacted, sorted copy of a header map for log output. Non-UTF-8 header
/// values render as a placeholder rather than bytes.
pub fn redact_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut copy = BTreeMap::new();
    for (name, value) in headers {
        let rendered = if is_sensitive(name.as_str()) {
            MASK.to_string()
        } else {
            value.to_str().unwrap_or("<binary>").to_string()
        };
        copy.insert(name.as_str().to_string(), rendered);
    }
    copy
}

/// Structurally identical copy of a JSON value with sensitive object fields
/// masked, recursively.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let masked = if is_sensitive(key) {
                        Value::String(MASK.to_string())
                    } else {
                        redact_json(value)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sensitive_fragments_match_substrings() {
        assert!(is_sensitive("Authorization"));
        assert!(is_sensitive("X-Api-Key"));
        assert!(is_sensitive("client_secret"));
        assert!(is_sensitive("refreshToken"));
        assert!(!is_sensitive("Content-Type"));
    }

    #[test]
    fn headers_are_masked_without_mutation() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Bearer secret".parse().unwrap());
        headers.insert("Accept", "application/json".parse().unwrap());

        let redacted = redact_headers(&headers);
        assert_eq!(redacted.get("authorization").unwrap(), MASK);
        assert_eq!(redacted.get("accept").unwrap(), "application/json");
        // original untouched
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer secret");
    }

    #[test]
    fn hyphenated_api_key_header_is_masked() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", "k-secret-1".parse().unwrap());

        let redacted = redact_headers(&headers);
        assert_eq!(redacted.get("x-api-key").unwrap(), MASK);
    }

    #[test]
    fn json_masking_recurses_into_nesting() {
        let body = json!({
            "password": "pw",
            "card": { "api_key_value": "k", "number": "4111" },
            "items": [ { "token": "t" } ]
        });
        let redacted = redact_json(&body);
        assert_eq!(redacted["password"], MASK);
        assert_eq!(redacted["card"]["api_key_value"], MASK);
        assert_eq!(redacted["card"]["number"], "4111");
        assert_eq!(redacted["items"][0]["token"], MASK);
        // input untouched
        assert_eq!(body["password"], "pw");
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(redact_json(&json!(42)), json!(42));
        assert_eq!(redact_json(&json!("plain")), json!("plain"));
    }
}
