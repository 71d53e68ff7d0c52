//! Durable key-value storage for rate-limit counters and audit entries.
//!
//! The store is injected behind a trait so the gateway never hard-codes a
//! backend: production runs against Postgres, the no-DSN development mode
//! and the tests run against an in-process map. Callers own the failure
//! policy; the store only reports errors.

use anyhow::Result;
use std::{future::Future, pin::Pin, time::Duration};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Boxed future returned by the object-safe store trait.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

pub trait KvStore: Send + Sync {
    /// Fetch the value for `key`, if present and not expired.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

    /// Store `value` under `key`. A `ttl` lets stale entries self-expire.
    fn put<'a>(&'a self, key: &'a str, value: String, ttl: Option<Duration>)
        -> StoreFuture<'a, ()>;
}
