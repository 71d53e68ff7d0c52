//! Shared auth state for the session gateway.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::store::KvStore;

use super::credentials::{constant_time_eq, CredentialRecord};
use super::rate_limit::RateLimiter;

/// Configured way to check the account secret.
///
/// The plaintext variant exists for development only and must be excluded
/// from any production deployment; `cli::actions::server` logs a warning
/// when it is active.
pub enum Credentials {
    Record(CredentialRecord),
    Plaintext(SecretString),
}

impl Credentials {
    /// Compare a supplied password against the configured credential.
    /// Both paths compare in constant time.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        match self {
            Self::Record(record) => record.verify(password),
            Self::Plaintext(secret) => {
                constant_time_eq(password.as_bytes(), secret.expose_secret().as_bytes())
            }
        }
    }
}

pub struct AuthState {
    secret: Option<SecretString>,
    credentials: Option<Credentials>,
    store: Arc<dyn KvStore>,
    limiter: RateLimiter,
}

impl AuthState {
    #[must_use]
    pub fn new(
        secret: Option<SecretString>,
        credentials: Option<Credentials>,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let limiter = RateLimiter::new(Arc::clone(&store));
        Self {
            secret,
            credentials,
            store,
            limiter,
        }
    }

    #[must_use]
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// HMAC signing key; `None` means the gateway is misconfigured and login
    /// must fail closed.
    #[must_use]
    pub fn secret(&self) -> Option<&SecretString> {
        self.secret.as_ref()
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn store(&self) -> &dyn KvStore {
        self.store.as_ref()
    }

    pub(crate) fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::credentials::CredentialRecord;
    use crate::store::MemoryStore;
    use anyhow::Result;

    #[test]
    fn record_credentials_verify_password() -> Result<()> {
        let record = CredentialRecord::generate("hunter2", 1_000)?;
        let credentials = Credentials::Record(record);
        assert!(credentials.verify("hunter2"));
        assert!(!credentials.verify("hunter3"));
        Ok(())
    }

    #[test]
    fn plaintext_credentials_verify_password() {
        let credentials = Credentials::Plaintext(SecretString::from("hunter2".to_string()));
        assert!(credentials.verify("hunter2"));
        assert!(!credentials.verify("hunter2 "));
        assert!(!credentials.verify(""));
    }

    #[test]
    fn state_without_secret_reports_misconfiguration() {
        let state = AuthState::new(None, None, Arc::new(MemoryStore::new()));
        assert!(state.secret().is_none());
        assert!(state.credentials().is_none());
    }
}
