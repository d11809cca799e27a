use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{self, SessionConfig};

pub const API_KEY_PREFIX: &str = "wk_";

/// Opaque 64-hex-character session token
pub fn generate_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// A fresh API key: `(secret, key_prefix, key_hash)`. Only the hash is stored.
pub fn generate_api_key() -> (String, String, String) {
    let secret = format!("{}{}", API_KEY_PREFIX, Uuid::new_v4().simple());
    let prefix: String = secret.chars().take(API_KEY_PREFIX.len() + 8).collect();
    let hash = hash_api_key(&secret);
    (secret, prefix, hash)
}

pub fn hash_api_key(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

/// Session token from, in order: `Authorization: Bearer`, the session cookie, the custom header
pub fn extract_token(headers: &HeaderMap, session: &SessionConfig) -> Option<String> {
    bearer_token(headers)
        .or_else(|| cookie_value(headers, &session.cookie_name))
        .or_else(|| {
            headers
                .get(session.header_name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v.to_string())
}

/// `Set-Cookie` value carrying a new session token
pub fn session_cookie(token: &str) -> String {
    let cfg = config::config();
    let max_age = cfg.session.expiry_days * 24 * 60 * 60;
    build_cookie(&cfg.session.cookie_name, token, max_age, cfg.security.secure_cookies)
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> String {
    let cfg = config::config();
    build_cookie(&cfg.session.cookie_name, "", 0, cfg.security.secure_cookies)
}

fn build_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", name, value, max_age);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn session_config() -> SessionConfig {
        SessionConfig {
            expiry_days: 7,
            cookie_name: "session_token".into(),
            header_name: "x-session-token".into(),
            trial_days: 14,
        }
    }

    #[test]
    fn session_tokens_are_64_hex() {
        let token = generate_session_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn api_keys_hash_to_stored_value() {
        let (secret, prefix, hash) = generate_api_key();
        assert!(secret.starts_with("wk_"));
        assert!(secret.starts_with(&prefix));
        assert_eq!(hash, hash_api_key(&secret));
        assert_ne!(hash, secret);
    }

    #[test]
    fn bearer_wins_over_cookie_and_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-session-token", HeaderValue::from_static("from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session_token=from-cookie"));
        assert_eq!(extract_token(&headers, &session_config()).as_deref(), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(extract_token(&headers, &session_config()).as_deref(), Some("from-bearer"));
    }

    #[test]
    fn custom_header_is_last_resort() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers, &session_config()), None);
        headers.insert("x-session-token", HeaderValue::from_static("abc"));
        assert_eq!(extract_token(&headers, &session_config()).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_flags() {
        let cookie = build_cookie("session_token", "t", 60, true);
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("; Secure"));
    }
}
