//! Postgres-backed key-value store.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;
use tracing::Instrument;

use super::{KvStore, StoreFuture};

/// Upper bound for any single store operation. The gateway degrades open on
/// rate-limit state, so a slow store must never stall a login.
const OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and apply the key-value schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema bootstrap fails.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .acquire_timeout(OPERATION_TIMEOUT)
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        sqlx::Executor::execute(&pool, SCHEMA_SQL)
            .await
            .context("Failed to apply key-value schema")?;

        Ok(Self { pool })
    }

    #[must_use]
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>> {
        let query =
            "SELECT value FROM kv_store WHERE key = $1 AND (expires_at IS NULL OR expires_at > NOW())";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = tokio::time::timeout(
            OPERATION_TIMEOUT,
            sqlx::query(query)
                .bind(key)
                .fetch_optional(&self.pool)
                .instrument(span),
        )
        .await
        .context("store read timed out")?
        .context("failed to read key")?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn upsert(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let query = r"
            INSERT INTO kv_store (key, value, expires_at, updated_at)
            VALUES (
                $1,
                $2,
                CASE WHEN $3::text IS NULL THEN NULL ELSE NOW() + $3::interval END,
                NOW()
            )
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at,
                updated_at = EXCLUDED.updated_at
        ";
        let ttl = ttl.map(|ttl| format!("{} seconds", ttl.as_secs()));
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        tokio::time::timeout(
            OPERATION_TIMEOUT,
            sqlx::query(query)
                .bind(key)
                .bind(value)
                .bind(ttl)
                .execute(&self.pool)
                .instrument(span),
        )
        .await
        .context("store write timed out")?
        .context("failed to write key")?;

        Ok(())
    }
}

impl KvStore for PgStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(self.fetch(key))
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.upsert(key, value, ttl))
    }
}
