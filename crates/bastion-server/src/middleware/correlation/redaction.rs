//! Sensitive data redaction utilities.

use std::collections::HashSet;

/// Headers that should be redacted in logs.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
    "x-access-token",
];

/// Fields that should be redacted in logged payloads.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "apikey",
    "credit_card",
    "ssn",
];

const REDACTED: &str = "[REDACTED]";

/// Redact sensitive headers from a header map.
pub fn redact_headers(
    headers: &axum::http::HeaderMap,
    additional: &[String],
) -> Vec<(String, String)> {
    let sensitive: HashSet<&str> = SENSITIVE_HEADERS
        .iter()
        .copied()
        .chain(additional.iter().map(|s| s.as_str()))
        .collect();

    headers
        .iter()
        .map(|(name, value)| {
            let value_str = if sensitive.contains(name.as_str()) {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("[non-utf8]").to_string()
            };
            (name.as_str().to_string(), value_str)
        })
        .collect()
}

/// Redact sensitive fields from a JSON value, at any depth.
pub fn redact_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| key_lower.contains(f)) {
                    *val = serde_json::Value::String(REDACTED.to_string());
                } else {
                    redact_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                redact_json(val);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use serde_json::json;

    #[test]
    fn test_redact_json() {
        let mut value = json!({
            "user": {
                "username": "ada",
                "passwordHash": "$2b$10$abc",
                "apiKey": "k-123"
            },
            "accessToken": "eyJ...",
            "message": "ok"
        });

        redact_json(&mut value);

        assert_eq!(value["user"]["username"], "ada");
        assert_eq!(value["user"]["passwordHash"], REDACTED);
        assert_eq!(value["user"]["apiKey"], REDACTED);
        assert_eq!(value["accessToken"], REDACTED);
        assert_eq!(value["message"], "ok");
    }

    #[test]
    fn test_redact_json_array() {
        let mut value = json!([
            {"username": "user1", "password": "secret1"},
            {"username": "user2", "token": "abc123"}
        ]);

        redact_json(&mut value);

        assert_eq!(value[0]["username"], "user1");
        assert_eq!(value[0]["password"], REDACTED);
        assert_eq!(value[1]["token"], REDACTED);
    }

    #[test]
    fn test_redact_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer token123".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("x-trace", "abc".parse().unwrap());

        let redacted = redact_headers(&headers, &["x-trace".to_string()]);
        let get = |name: &str| {
            redacted
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("authorization"), REDACTED);
        assert_eq!(get("content-type"), "application/json");
        assert_eq!(get("x-trace"), REDACTED);
    }
}
