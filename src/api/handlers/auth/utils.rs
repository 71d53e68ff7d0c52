//! Small helpers shared by the auth handlers.

use axum::http::HeaderMap;
use chrono::Utc;

/// Client identity used for rate limiting, taken from trusted proxy
/// headers. Without a reverse proxy supplying the real address every
/// anonymous client lands in the shared `"unknown"` bucket.
pub(crate) fn client_identity(headers: &HeaderMap) -> String {
    let connecting_ip = headers
        .get("cf-connecting-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = connecting_ip {
        return ip.to_string();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| "unknown".to_string(), str::to_string)
}

pub(crate) fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map_or_else(|| "unknown".to_string(), str::to_string)
}

pub(crate) fn now_unix() -> i64 {
    Utc::now().timestamp()
}
