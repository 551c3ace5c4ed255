//! In-memory idempotency store
//!
//! A mutex-guarded map of event key to expiry instant. Expiry is enforced
//! lazily on every lookup; the background sweep only reclaims memory.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{IdempotencyStore, MAX_TTL};

/// Default time between sweeps of expired records (1 minute)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type Records = Mutex<HashMap<String, Instant>>;

/// In-memory idempotency store
///
/// Suitable for single-instance deployments and tests. Records are lost on
/// restart and are not shared across instances; use the Redis store when
/// several processes receive webhooks.
///
/// # Sweeping
///
/// A periodic task on the Tokio runtime removes expired records. It is
/// spawned on construction, or, for a store built outside a runtime, by the
/// first [`record_if_absent`](IdempotencyStore::record_if_absent) call made
/// inside one. Until then expired records are only replaced lazily and
/// records for distinct keys accumulate.
///
/// The task only holds a weak reference to the records, so it never keeps
/// them alive. Call [`shutdown`](Self::shutdown) to stop it and clear the
/// store; dropping the store aborts it as well. No sweep is started again
/// after shutdown.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use tideway_webhooks::webhooks::InMemoryIdempotencyStore;
///
/// let store = Arc::new(InMemoryIdempotencyStore::new());
/// let config = PipelineConfig::builder()
///     .paystack(secret_key)
///     .idempotency_store(store.clone())
///     .build();
///
/// // On shutdown
/// store.shutdown().await;
/// ```
pub struct InMemoryIdempotencyStore {
    records: Arc<Records>,
    sweep_interval: Duration,
    /// Shutdown flag for background sweep
    shutdown: Arc<AtomicBool>,
    /// Set once a sweep task has been spawned
    sweep_started: AtomicBool,
    /// Handle to sweep task
    sweep_handle: Mutex<Option<JoinHandle<()>>>,
}

impl InMemoryIdempotencyStore {
    /// Create a store that sweeps expired records every minute
    ///
    /// Outside a Tokio runtime the sweep starts with the first
    /// `record_if_absent` call made inside one.
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    /// Create a store with a custom sweep interval
    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        let records = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = start_sweep_task(Arc::downgrade(&records), shutdown.clone(), sweep_interval);
        if handle.is_none() {
            tracing::debug!(
                target: "tideway::webhooks",
                "No Tokio runtime available, idempotency sweep starts on first use"
            );
        }

        Self {
            records,
            sweep_interval,
            shutdown,
            sweep_started: AtomicBool::new(handle.is_some()),
            sweep_handle: Mutex::new(handle),
        }
    }

    /// Spawn the sweep task if it isn't running yet and a runtime is available
    async fn ensure_sweep_task(&self) {
        if self.sweep_started.load(Ordering::Acquire) || self.shutdown.load(Ordering::Acquire) {
            return;
        }

        let mut handle = self.sweep_handle.lock().await;
        if handle.is_some() || self.shutdown.load(Ordering::Acquire) {
            return;
        }

        *handle = start_sweep_task(
            Arc::downgrade(&self.records),
            self.shutdown.clone(),
            self.sweep_interval,
        );
        if handle.is_some() {
            self.sweep_started.store(true, Ordering::Release);
            tracing::debug!(target: "tideway::webhooks", "Idempotency sweep task started");
        }
    }

    /// Remove expired records now, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        purge_expired(&self.records).await
    }

    /// Number of stored records, including expired ones not yet swept
    pub async fn entry_count(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Stop the sweep task and clear every record
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);

        let handle = self.sweep_handle.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            // A cancelled JoinError is the expected result here
            let _ = handle.await;
            tracing::debug!(target: "tideway::webhooks", "Idempotency sweep task stopped");
        }

        self.records.lock().await.clear();
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InMemoryIdempotencyStore {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep_handle.get_mut().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn record_if_absent(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.ensure_sweep_task().await;

        let mut records = self.records.lock().await;
        let now = Instant::now();

        // Check and insert under the same lock acquisition
        if let Some(expires_at) = records.get(key) {
            if *expires_at > now {
                return Ok(false);
            }
        }

        records.insert(key.to_string(), now + ttl.min(MAX_TTL));
        Ok(true)
    }

    async fn shutdown(&self) {
        InMemoryIdempotencyStore::shutdown(self).await
    }
}

async fn purge_expired(records: &Records) -> usize {
    let mut records = records.lock().await;
    let now = Instant::now();
    let before = records.len();
    records.retain(|_, expires_at| *expires_at > now);
    before - records.len()
}

/// Start background task that removes expired records
fn start_sweep_task(
    records: Weak<Records>,
    shutdown: Arc<AtomicBool>,
    sweep_interval: Duration,
) -> Option<JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current().ok()?;

    let period = sweep_interval.max(Duration::from_millis(1));

    Some(runtime.spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if shutdown.load(Ordering::Acquire) {
                break;
            }

            // Store dropped
            let Some(records) = records.upgrade() else {
                break;
            };

            let removed = purge_expired(&records).await;
            if removed > 0 {
                tracing::debug!(
                    target: "tideway::webhooks",
                    removed,
                    "Swept expired idempotency records"
                );
            }
        }
    }))
}
