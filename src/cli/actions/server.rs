use crate::api;
use crate::api::handlers::auth::{credentials::CredentialRecord, AuthState, Credentials};
use crate::cli::actions::Action;
use crate::store::{KvStore, MemoryStore, PgStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server {
        port,
        dsn,
        jwt_secret,
        password_hash,
        password,
        frontend_url,
    } = action
    else {
        return Ok(());
    };

    let store: Arc<dyn KvStore> = match dsn {
        Some(dsn) => Arc::new(PgStore::connect(&dsn).await?),
        None => {
            warn!(
                "No DSN configured; rate-limit counters and audit entries are kept in process memory"
            );
            Arc::new(MemoryStore::new())
        }
    };

    if jwt_secret.is_none() {
        warn!("JWT_SECRET not configured; logins will fail until it is set");
    }

    let credentials = match (password_hash, password) {
        (Some(record), _) => {
            let record: CredentialRecord = record
                .parse()
                .context("invalid AUTH_PASSWORD_HASH, expected iterations:salt:hash")?;
            Some(Credentials::Record(record))
        }
        (None, Some(password)) => {
            warn!("Using plaintext AUTH_PASSWORD fallback; do not deploy this to production");
            Some(Credentials::Plaintext(password))
        }
        (None, None) => {
            warn!("No credentials configured; every login will be rejected");
            None
        }
    };

    let auth_state = Arc::new(AuthState::new(jwt_secret, credentials, store));

    api::new(port, &frontend_url, auth_state).await?;

    Ok(())
}
