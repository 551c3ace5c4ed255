//! Idempotency stores used for replay protection.
//!
//! Provides an in-memory store by default, with optional Redis support
//! via the `idempotency-redis` feature.

mod config;
mod in_memory;

#[cfg(feature = "idempotency-redis")]
mod redis;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use config::{IdempotencyBackend, IdempotencyConfig};

/// Upper bound on how long any backend keeps a record (10 years)
pub(crate) const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 3600);
pub use in_memory::InMemoryIdempotencyStore;

#[cfg(feature = "idempotency-redis")]
pub use self::redis::RedisIdempotencyStore;

/// Records processed webhook event ids so each one is accepted at most once
///
/// [`record_if_absent`](IdempotencyStore::record_if_absent) checks and records
/// in one atomic step: of any number of concurrent callers with the same key,
/// exactly one sees `true` until the record expires.
///
/// # Example
///
/// ```rust,ignore
/// use tideway_webhooks::webhooks::{IdempotencyStore, InMemoryIdempotencyStore};
///
/// let store = InMemoryIdempotencyStore::new();
/// assert!(store.record_if_absent("paystack:1", Duration::from_secs(600)).await?);
/// assert!(!store.record_if_absent("paystack:1", Duration::from_secs(600)).await?);
/// ```
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Atomically record `key` for `ttl` unless it is already live
    ///
    /// Returns `Ok(true)` when this call recorded the key, `Ok(false)` when the
    /// key was already recorded and has not expired yet. Backend failures are
    /// returned as errors, never folded into either answer.
    async fn record_if_absent(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Check if the store backend is healthy
    fn is_healthy(&self) -> bool {
        true
    }

    /// Release background tasks and local state held by the store
    ///
    /// Stores without either keep the default no-op. Records held by an
    /// external backend are left alone.
    async fn shutdown(&self) {}
}
