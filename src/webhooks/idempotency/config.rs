use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::IdempotencyStore;
use super::in_memory::{DEFAULT_SWEEP_INTERVAL, InMemoryIdempotencyStore};
use crate::error::Result;
use crate::utils::{get_env_with_prefix, parse_env_with_prefix};

/// Idempotency backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdempotencyBackend {
    /// In-memory store (default)
    #[default]
    InMemory,
    /// Redis store (requires idempotency-redis feature)
    #[cfg(feature = "idempotency-redis")]
    Redis,
}

/// Idempotency store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdempotencyConfig {
    /// Store backend type
    #[serde(default)]
    pub backend: IdempotencyBackend,

    /// Redis connection URL (only used for Redis backend)
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix for Redis keys (only used for Redis backend)
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Seconds between sweeps of expired records (in-memory backend only)
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            backend: IdempotencyBackend::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl IdempotencyConfig {
    /// Load idempotency configuration from environment variables
    ///
    /// Reads `TIDEWAY_IDEMPOTENCY_BACKEND`, `TIDEWAY_IDEMPOTENCY_REDIS_URL`,
    /// `TIDEWAY_IDEMPOTENCY_KEY_PREFIX` and
    /// `TIDEWAY_IDEMPOTENCY_SWEEP_INTERVAL_SECONDS` (each also without the
    /// `TIDEWAY_` prefix).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(backend) = get_env_with_prefix("IDEMPOTENCY_BACKEND") {
            config.backend = match backend.to_lowercase().as_str() {
                "redis" => {
                    #[cfg(feature = "idempotency-redis")]
                    {
                        IdempotencyBackend::Redis
                    }
                    #[cfg(not(feature = "idempotency-redis"))]
                    {
                        tracing::warn!("Redis idempotency store requested but idempotency-redis feature not enabled, using in-memory");
                        IdempotencyBackend::InMemory
                    }
                }
                _ => IdempotencyBackend::InMemory,
            };
        }

        if let Some(url) = get_env_with_prefix("IDEMPOTENCY_REDIS_URL") {
            config.redis_url = Some(url);
        }

        if let Some(prefix) = get_env_with_prefix("IDEMPOTENCY_KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        if let Some(seconds) = parse_env_with_prefix("IDEMPOTENCY_SWEEP_INTERVAL_SECONDS") {
            config.sweep_interval_seconds = seconds;
        }

        config
    }

    /// Construct the configured store
    pub fn build_store(&self) -> Result<Arc<dyn IdempotencyStore>> {
        match self.backend {
            IdempotencyBackend::InMemory => Ok(Arc::new(InMemoryIdempotencyStore::with_sweep_interval(
                Duration::from_secs(self.sweep_interval_seconds),
            ))),
            #[cfg(feature = "idempotency-redis")]
            IdempotencyBackend::Redis => {
                let url = self.redis_url.as_deref().ok_or_else(|| {
                    crate::error::TidewayError::config("Redis idempotency backend requires redis_url")
                })?;
                Ok(Arc::new(super::RedisIdempotencyStore::with_prefix(
                    url,
                    self.key_prefix.clone(),
                )?))
            }
        }
    }
}

fn default_key_prefix() -> String {
    "tideway:webhook:".to_string()
}

fn default_sweep_interval_seconds() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}
