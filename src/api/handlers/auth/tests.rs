//! End-to-end gateway tests: the login/verify/logout flows exercised through
//! the handlers over an in-process store.

use super::credentials::CredentialRecord;
use super::session::{login, logout, preflight, verify, verify_token};
use super::state::{AuthState, Credentials};
use super::token::{sign_hs256, SessionClaims, TOKEN_TTL_SECONDS};
use super::types::{LoginRequest, VerifyTokenRequest};
use super::utils::now_unix;
use crate::store::{KvStore, MemoryStore};
use anyhow::{anyhow, Context, Result};
use axum::body::to_bytes;
use axum::extract::Extension;
use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue, StatusCode,
};
use axum::response::Response;
use secrecy::SecretString;
use std::sync::Arc;

const SECRET: &str = "0f8e2a41c6d54b1f9c3be7a8d2904e6f";
const PASSWORD: &str = "correct horse battery";
const TEST_ITERATIONS: u32 = 1_000;

fn gateway() -> Result<Extension<Arc<AuthState>>> {
    let record = CredentialRecord::generate(PASSWORD, TEST_ITERATIONS)?;
    Ok(Extension(Arc::new(AuthState::new(
        Some(SecretString::from(SECRET.to_string())),
        Some(Credentials::Record(record)),
        Arc::new(MemoryStore::new()),
    ))))
}

fn gateway_without_secret() -> Extension<Arc<AuthState>> {
    Extension(Arc::new(AuthState::new(
        None,
        None,
        Arc::new(MemoryStore::new()),
    )))
}

fn client_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.7"));
    headers
}

fn login_body(password: &str) -> Option<axum::Json<LoginRequest>> {
    Some(axum::Json(LoginRequest {
        password: password.to_string(),
    }))
}

async fn body_json(response: Response) -> Result<serde_json::Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn session_cookie_value(response: &Response) -> Result<String> {
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie header")?
        .to_str()?;
    let token = cookie
        .strip_prefix("auth_token=")
        .and_then(|rest| rest.split(';').next())
        .context("malformed session cookie")?;
    Ok(token.to_string())
}

fn cookie_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_str(&format!("auth_token={token}"))?,
    );
    Ok(headers)
}

#[tokio::test]
async fn successful_login_sets_cookie_and_verifies() -> Result<()> {
    let state = gateway()?;

    let response = login(client_headers(), state.clone(), login_body(PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = session_cookie_value(&response)?;
    assert_eq!(token.split('.').count(), 3);

    let body = body_json(response).await?;
    assert_eq!(
        body.get("success").and_then(serde_json::Value::as_bool),
        Some(true)
    );

    let response = verify(cookie_headers(&token)?, state).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(
        body.get("valid").and_then(serde_json::Value::as_bool),
        Some(true)
    );
    let user = body.get("user").context("missing user")?;
    assert_eq!(
        user.get("sub").and_then(serde_json::Value::as_str),
        Some("admin")
    );
    assert_eq!(
        user.get("role").and_then(serde_json::Value::as_str),
        Some("admin")
    );
    Ok(())
}

#[tokio::test]
async fn login_without_secret_fails_closed() -> Result<()> {
    let response = login(
        client_headers(),
        gateway_without_secret(),
        login_body(PASSWORD),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await?;
    assert_eq!(
        body.get("error").and_then(serde_json::Value::as_str),
        Some("Server configuration error")
    );
    Ok(())
}

#[tokio::test]
async fn login_without_password_is_rejected() -> Result<()> {
    let state = gateway()?;
    let response = login(client_headers(), state.clone(), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = login(client_headers(), state, login_body("")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn wrong_password_counts_down_remaining_attempts() -> Result<()> {
    let state = gateway()?;

    for expected_remaining in (0..5).rev() {
        let response = login(client_headers(), state.clone(), login_body("wrong")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await?;
        assert_eq!(
            body.get("error").and_then(serde_json::Value::as_str),
            Some("Invalid credentials")
        );
        assert_eq!(
            body.get("remainingAttempts")
                .and_then(serde_json::Value::as_u64),
            Some(expected_remaining)
        );
    }
    Ok(())
}

#[tokio::test]
async fn sixth_attempt_is_rate_limited() -> Result<()> {
    let state = gateway()?;

    for _ in 0..5 {
        let response = login(client_headers(), state.clone(), login_body("wrong")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // The correct password no longer helps once the window is exhausted.
    let response = login(client_headers(), state, login_body(PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok()),
        Some("0")
    );
    assert!(response.headers().get("x-ratelimit-reset").is_some());

    let body = body_json(response).await?;
    let retry_after = body
        .get("retryAfter")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| anyhow!("missing retryAfter"))?;
    assert!((0..=60).contains(&retry_after));
    Ok(())
}

#[tokio::test]
async fn rate_limit_buckets_are_per_identity() -> Result<()> {
    let state = gateway()?;

    for _ in 0..5 {
        let response = login(client_headers(), state.clone(), login_body("wrong")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = login(client_headers(), state.clone(), login_body(PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let mut other = HeaderMap::new();
    other.insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.9"));
    let response = login(other, state, login_body(PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn verify_rejects_missing_and_garbage_cookies() -> Result<()> {
    let state = gateway()?;

    let response = verify(HeaderMap::new(), state.clone()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await?;
    assert_eq!(
        body.get("valid").and_then(serde_json::Value::as_bool),
        Some(false)
    );

    let response = verify(cookie_headers("not.a.token")?, state).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn verify_rejects_tampered_signature() -> Result<()> {
    let state = gateway()?;
    let response = login(client_headers(), state.clone(), login_body(PASSWORD)).await;
    let token = session_cookie_value(&response)?;

    let mut tampered = token.clone();
    let last = tampered.pop().context("empty token")?;
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let response = verify(cookie_headers(&tampered)?, state).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn verify_rejects_expired_token() -> Result<()> {
    let state = gateway()?;

    // Forge an already-expired token with the real secret.
    let issued_at = now_unix() - TOKEN_TTL_SECONDS - 10;
    let claims = SessionClaims::new("admin", "admin", None, issued_at);
    let token = sign_hs256(SECRET.as_bytes(), &claims)?;

    let response = verify(cookie_headers(&token)?, state).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Same generic message as a tampered token: no oracle for the caller.
    let body = body_json(response).await?;
    assert_eq!(
        body.get("error").and_then(serde_json::Value::as_str),
        Some("Invalid or expired token")
    );
    Ok(())
}

#[tokio::test]
async fn verify_post_checks_body_token() -> Result<()> {
    let state = gateway()?;
    let response = login(client_headers(), state.clone(), login_body(PASSWORD)).await;
    let token = session_cookie_value(&response)?;

    let response = verify_token(
        state.clone(),
        Some(axum::Json(VerifyTokenRequest { token })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = verify_token(state.clone(), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = verify_token(
        state,
        Some(axum::Json(VerifyTokenRequest {
            token: "garbage".to_string(),
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookie_and_is_idempotent() -> Result<()> {
    let state = gateway()?;
    let response = login(client_headers(), state.clone(), login_body(PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);

    for _ in 0..2 {
        let response = logout().await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .context("missing Set-Cookie")?
            .to_str()?;
        assert!(cookie.starts_with("auth_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    // The client dropped its cookie, so verification now fails.
    let response = verify(HeaderMap::new(), state).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_does_not_revoke_issued_tokens() -> Result<()> {
    let state = gateway()?;
    let response = login(client_headers(), state.clone(), login_body(PASSWORD)).await;
    let token = session_cookie_value(&response)?;

    let _ = logout().await;

    // A client that kept the raw token can still use it until expiry.
    let response = verify(cookie_headers(&token)?, state).await;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn preflight_returns_no_content() {
    assert_eq!(preflight().await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn custom_limits_shrink_the_window_budget() -> Result<()> {
    let store: Arc<crate::store::MemoryStore> = Arc::new(MemoryStore::new());
    let record = CredentialRecord::generate(PASSWORD, TEST_ITERATIONS)?;
    let state = AuthState::new(
        Some(SecretString::from(SECRET.to_string())),
        Some(Credentials::Record(record)),
        Arc::clone(&store) as Arc<dyn crate::store::KvStore>,
    )
    .with_limiter(super::rate_limit::RateLimiter::with_limits(
        Arc::clone(&store) as Arc<dyn crate::store::KvStore>,
        2,
        60,
    ));
    let state = Extension(Arc::new(state));

    for _ in 0..2 {
        let response = login(client_headers(), state.clone(), login_body("wrong")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = login(client_headers(), state, login_body(PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}

#[tokio::test]
async fn plaintext_fallback_authenticates() -> Result<()> {
    let state = Extension(Arc::new(AuthState::new(
        Some(SecretString::from(SECRET.to_string())),
        Some(Credentials::Plaintext(SecretString::from(
            "dev-password".to_string(),
        ))),
        Arc::new(MemoryStore::new()),
    )));

    let response = login(client_headers(), state.clone(), login_body("dev-password")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = login(client_headers(), state, login_body("wrong")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn gateway_without_credentials_rejects_all_logins() -> Result<()> {
    let state = Extension(Arc::new(AuthState::new(
        Some(SecretString::from(SECRET.to_string())),
        None,
        Arc::new(MemoryStore::new()),
    )));

    let response = login(client_headers(), state, login_body(PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn audit_entry_is_written_on_successful_login() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let record = CredentialRecord::generate(PASSWORD, TEST_ITERATIONS)?;
    let state = Extension(Arc::new(AuthState::new(
        Some(SecretString::from(SECRET.to_string())),
        Some(Credentials::Record(record)),
        Arc::clone(&store) as Arc<dyn crate::store::KvStore>,
    )));

    let response = login(client_headers(), state, login_body(PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let now = chrono::Utc::now().timestamp_millis();
    let mut found = false;
    for offset in 0..5_000 {
        if let Some(raw) = store.get(&format!("audit:{}", now - offset)).await? {
            let entry: serde_json::Value = serde_json::from_str(&raw)?;
            assert_eq!(
                entry.get("action").and_then(serde_json::Value::as_str),
                Some("login_success")
            );
            assert_eq!(
                entry.get("ip").and_then(serde_json::Value::as_str),
                Some("203.0.113.7")
            );
            found = true;
            break;
        }
    }
    assert!(found, "no audit entry written");
    Ok(())
}
