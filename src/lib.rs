//! # Opsgate (Dashboard Session Gateway)
//!
//! `opsgate` is the authentication gateway for the agent operations
//! dashboard. It owns the security-relevant surface of the system:
//!
//! - **Login** (`POST /auth`): rate-limited, constant-time credential
//!   verification against a PBKDF2-SHA256 record, issuing an HS256 session
//!   token in an `HttpOnly` cookie.
//! - **Verification** (`GET`/`POST /verify`): stateless signature and
//!   expiry checks; expired and tampered tokens are indistinguishable to
//!   the caller.
//! - **Logout** (`POST /logout`): clears the cookie. There is no revocation
//!   list; issued tokens remain valid until expiry.
//!
//! Rate-limit counters and audit entries live in a durable key-value store
//! (Postgres) injected behind a trait; the store is best-effort and the
//! rate limiter deliberately degrades open during outages. The agent-fleet
//! feed (`/agents`) is display data served alongside the gateway and never
//! inspected by the auth core.

pub mod api;
pub mod cli;
pub mod fleet;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
