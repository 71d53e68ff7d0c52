//! Session endpoints: login, verify, logout.
//!
//! Login walks a fixed sequence: signing secret present, rate limit, then
//! credential check, then token issuance. The resulting JWT rides in an
//! `HttpOnly` cookie; verification is stateless and logout only clears the
//! cookie (issued tokens stay valid until expiry).

use axum::{
    extract::Extension,
    http::{
        header::{HeaderValue, InvalidHeaderValue, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::{
    audit,
    state::AuthState,
    token::{sign_hs256, verify_hs256, SessionClaims, TOKEN_TTL_SECONDS},
    types::{
        AuthError, LoginRequest, LoginResponse, LogoutResponse, SessionUser, VerifyResponse,
        VerifyTokenRequest,
    },
    utils::{client_identity, now_unix, user_agent},
};

pub(crate) const SESSION_COOKIE_NAME: &str = "auth_token";

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

#[utoipa::path(
    post,
    path = "/auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; session cookie set", body = LoginResponse),
        (status = 400, description = "Password missing", body = AuthError),
        (status = 401, description = "Invalid credentials", body = AuthError),
        (status = 429, description = "Too many attempts", body = AuthError),
        (status = 500, description = "Signing secret not configured", body = AuthError)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    // Fail closed when the signing secret is absent; issuing an unsigned or
    // weakly-signed session is never acceptable.
    let Some(secret) = auth_state.secret() else {
        error!("JWT secret not configured, refusing login");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AuthError::new("Server configuration error")),
        )
            .into_response();
    };

    let identity = client_identity(&headers);
    let status = auth_state.limiter().check(&identity).await;
    if !status.allowed {
        let retry_after = (status.reset_at - now_unix()).max(0);
        let mut response_headers = HeaderMap::new();
        response_headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from_static("0"));
        if let Ok(reset) = HeaderValue::from_str(&status.reset_at.to_string()) {
            response_headers.insert(RATE_LIMIT_RESET, reset);
        }
        warn!("Rate limited login from {identity}");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            response_headers,
            Json(
                AuthError::new("Too many attempts. Please try again later.")
                    .with_retry_after(retry_after),
            ),
        )
            .into_response();
    }

    let password = payload
        .map(|Json(request)| request.password)
        .unwrap_or_default();
    if password.is_empty() {
        auth_state.limiter().increment(&identity).await;
        return (
            StatusCode::BAD_REQUEST,
            Json(AuthError::new("Password required")),
        )
            .into_response();
    }

    let password_valid = auth_state
        .credentials()
        .is_some_and(|credentials| credentials.verify(&password));
    if !password_valid {
        auth_state.limiter().increment(&identity).await;
        return (
            StatusCode::UNAUTHORIZED,
            Json(
                AuthError::new("Invalid credentials")
                    .with_remaining_attempts(status.remaining.saturating_sub(1)),
            ),
        )
            .into_response();
    }

    let claims = SessionClaims::new("admin", "admin", Some(identity.clone()), now_unix());
    let token = match sign_hs256(secret.expose_secret().as_bytes(), &claims) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to sign session token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AuthError::new("Internal server error")),
            )
                .into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    match session_cookie(&token) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AuthError::new("Internal server error")),
            )
                .into_response();
        }
    }
    if let Ok(remaining) = HeaderValue::from_str(&status.remaining.to_string()) {
        response_headers.insert(RATE_LIMIT_REMAINING, remaining);
    }

    audit::record_login(auth_state.store(), &identity, &user_agent(&headers)).await;

    (
        StatusCode::OK,
        response_headers,
        Json(LoginResponse {
            success: true,
            message: "Authentication successful".to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/verify",
    responses(
        (status = 200, description = "Session cookie is valid", body = VerifyResponse),
        (status = 401, description = "Missing, invalid, or expired token", body = VerifyResponse)
    ),
    tag = "auth"
)]
pub async fn verify(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let Some(token) = extract_session_token(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse::invalid("No token provided")),
        )
            .into_response();
    };

    match verify_claims(&auth_state, &token) {
        Some(claims) => (
            StatusCode::OK,
            Json(VerifyResponse::valid(Some(SessionUser {
                sub: claims.sub,
                role: claims.role,
            }))),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse::invalid("Invalid or expired token")),
        )
            .into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/verify",
    request_body = VerifyTokenRequest,
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 400, description = "Token missing", body = VerifyResponse),
        (status = 401, description = "Invalid or expired token", body = VerifyResponse)
    ),
    tag = "auth"
)]
pub async fn verify_token(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyTokenRequest>>,
) -> Response {
    let token = payload
        .map(|Json(request)| request.token)
        .unwrap_or_default();
    if token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(VerifyResponse::invalid("Token required")),
        )
            .into_response();
    }

    if verify_claims(&auth_state, &token).is_some() {
        (StatusCode::OK, Json(VerifyResponse::valid(None))).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse::invalid("Invalid token")),
        )
            .into_response()
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout() -> Response {
    // Unconditional and idempotent: overwrite whatever cookie the client
    // holds with an immediately-expired value.
    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, clear_session_cookie());
    (
        StatusCode::OK,
        response_headers,
        Json(LogoutResponse { success: true }),
    )
        .into_response()
}

/// Cross-origin preflight response shared by every endpoint.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Validate a token against the configured secret. The reason for a
/// rejection is logged but never surfaced: expired and tampered tokens are
/// indistinguishable to the caller.
fn verify_claims(auth_state: &AuthState, token: &str) -> Option<SessionClaims> {
    let secret = auth_state.secret()?;
    match verify_hs256(token, secret.expose_secret().as_bytes(), now_unix()) {
        Ok(claims) => Some(claims),
        Err(err) => {
            debug!("Rejected session token: {err}");
            None
        }
    }
}

fn session_cookie(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age={TOKEN_TTL_SECONDS}"
    ))
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "auth_token=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0",
    )
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}
