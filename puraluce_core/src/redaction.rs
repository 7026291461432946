use regex::Regex;
use std::sync::OnceLock;

/// Masks credentials that may leak into session logs: auth headers,
/// key-bearing query parameters and raw provider keys.
pub fn redact_sensitive_text(input: &str) -> String {
    static AUTH_BEARER_RE: OnceLock<Regex> = OnceLock::new();
    static HEADER_KEY_RE: OnceLock<Regex> = OnceLock::new();
    static QUERY_TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    static KEY_LIKE_RE: OnceLock<Regex> = OnceLock::new();

    let auth_bearer_re = AUTH_BEARER_RE.get_or_init(|| {
        Regex::new(r#"(?i)(authorization\s*:\s*bearer\s+)([A-Za-z0-9._~+/=-]+)"#).unwrap()
    });
    let header_key_re = HEADER_KEY_RE.get_or_init(|| {
        Regex::new(r#"(?i)((?:x-api-key|x-goog-api-key)\s*:\s*)([A-Za-z0-9._~+/=-]+)"#).unwrap()
    });
    let query_token_re = QUERY_TOKEN_RE.get_or_init(|| {
        Regex::new(r#"(?i)([?&](?:token|access_token|api_key|apikey|key)=)([^&\s"']+)"#).unwrap()
    });
    let key_like_re = KEY_LIKE_RE.get_or_init(|| {
        Regex::new(r#"\b(?:(?:sk|rk)-[A-Za-z0-9_-]{12,}|AIza[0-9A-Za-z_-]{20,})"#).unwrap()
    });

    let step1 = auth_bearer_re
        .replace_all(input, "$1[REDACTED]")
        .to_string();
    let step2 = header_key_re
        .replace_all(&step1, "$1[REDACTED]")
        .to_string();
    let step3 = query_token_re
        .replace_all(&step2, "$1[REDACTED]")
        .to_string();
    key_like_re.replace_all(&step3, "[REDACTED]").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_masks_common_secrets() {
        let raw = r#"Authorization: Bearer abc123token
x-goog-api-key: supersecret
https://a.com/v1beta/models?key=abc&x=1
sk-live-1234567890abcdef
AIzaSyA1234567890abcdefghijklmnop"#;

        let masked = redact_sensitive_text(raw);
        assert!(!masked.contains("abc123token"));
        assert!(!masked.contains("supersecret"));
        assert!(!masked.contains("sk-live-1234567890abcdef"));
        assert!(!masked.contains("AIzaSyA1234567890abcdefghijklmnop"));
        assert!(masked.contains("Authorization: Bearer [REDACTED]"));
        assert!(masked.contains("x-goog-api-key: [REDACTED]"));
        assert!(masked.contains("key=[REDACTED]&x=1"));
    }

    #[test]
    fn prose_is_left_alone() {
        let text = "Il fedele chiede aiuto per: \"Paura del futuro\". Skip-list ok.";
        assert_eq!(redact_sensitive_text(text), text);
    }
}
