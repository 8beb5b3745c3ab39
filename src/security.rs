use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

/// Header carrying the admin API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing API keys and other secrets
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check the admin key sent in `x-api-key` (or as a bearer token) against
/// the configured one
pub fn is_authorized(headers: &HeaderMap, expected_key: &str) -> bool {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        });

    match provided {
        Some(key) => constant_time_compare(key.trim(), expected_key),
        None => false,
    }
}
