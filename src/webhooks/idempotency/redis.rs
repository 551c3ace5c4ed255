use crate::error::{Result, TidewayError};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{IdempotencyStore, MAX_TTL};

/// Default namespace for idempotency keys in a shared keyspace
pub const DEFAULT_KEY_PREFIX: &str = "tideway:webhook:";

/// Redis-backed idempotency store
///
/// Atomicity is delegated to Redis: every call is a single
/// `SET <prefix><key> 1 NX EX <ttl>`, and the key counts as newly recorded
/// exactly when Redis replies `OK`. Expiry is left to Redis' native key
/// expiration, so there is no sweep task.
///
/// Connection and command failures are returned as
/// [`TidewayError::ServiceUnavailable`] (or `Internal` for protocol errors),
/// never as "duplicate" or "not duplicate".
///
/// [`is_healthy`](IdempotencyStore::is_healthy) never touches the network: it
/// reports the result of the last command or [`ping`](Self::ping).
#[derive(Clone)]
pub struct RedisIdempotencyStore {
    client: redis::Client,
    key_prefix: String,
    health_status: Arc<AtomicBool>,
}

impl RedisIdempotencyStore {
    /// Create a new Redis store from a connection URL
    pub fn new(url: &str) -> Result<Self> {
        Self::with_prefix(url, DEFAULT_KEY_PREFIX)
    }

    /// Create a store that namespaces keys with a custom prefix
    pub fn with_prefix(url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| TidewayError::config(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
            health_status: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Ping Redis and update health status
    ///
    /// Call this periodically to keep [`is_healthy`](IdempotencyStore::is_healthy)
    /// accurate between webhooks.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// tokio::spawn(async move {
    ///     let mut interval = tokio::time::interval(Duration::from_secs(30));
    ///     loop {
    ///         interval.tick().await;
    ///         store.ping().await;
    ///     }
    /// });
    /// ```
    pub async fn ping(&self) -> bool {
        let healthy = match self.get_connection().await {
            Ok(mut conn) => redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .is_ok(),
            Err(e) => {
                tracing::warn!(target: "tideway::webhooks", error = %e, "Redis ping failed");
                false
            }
        };
        self.health_status.store(healthy, Ordering::Release);
        healthy
    }

    /// Full Redis key for an event key
    pub fn namespaced_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Get a connection from the Redis client
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                TidewayError::service_unavailable(format!("Failed to get Redis connection: {}", e))
            })
    }
}

/// Redis `EX` takes whole seconds and rejects zero
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0))
        .clamp(1, MAX_TTL.as_secs())
}

#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    async fn record_if_absent(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.get_connection().await.inspect_err(|_| {
            self.health_status.store(false, Ordering::Release);
        })?;

        // Reply is "OK" when set, nil when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.namespaced_key(key))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!(
                    target: "tideway::webhooks",
                    error = %e,
                    "Redis SET NX failed"
                );
                self.health_status.store(false, Ordering::Release);
                TidewayError::from(e)
            })?;

        self.health_status.store(true, Ordering::Release);
        Ok(reply.is_some())
    }

    fn is_healthy(&self) -> bool {
        self.health_status.load(Ordering::Acquire)
    }
}
