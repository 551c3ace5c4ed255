//! tideway-webhooks - verification and replay protection for payment webhooks
//!
//! Authenticates inbound webhook notifications from payment providers and
//! keeps forged, duplicated, or stale events away from business logic.
//!
//! # Features
//!
//! - **Providers**: Paystack (HMAC-SHA512) and Flutterwave (secret hash)
//! - **Timing-safe comparison**: Every signature check runs in constant time
//! - **Freshness**: Reject events older than a configured age
//! - **Idempotency**: Atomic record-if-absent with in-memory or Redis backends
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tideway_webhooks::PipelineConfig;
//! use tideway_webhooks::webhooks::{
//!     InMemoryIdempotencyStore, VerificationOutcome, WebhookHeaders, verify_webhook,
//! };
//!
//! # async fn handle(body: &[u8], headers: WebhookHeaders) -> tideway_webhooks::Result<()> {
//! let config = PipelineConfig::builder()
//!     .paystack("sk_live_...")
//!     .idempotency_store(Arc::new(InMemoryIdempotencyStore::new()))
//!     .max_age(Duration::from_secs(300))
//!     .build();
//!
//! match verify_webhook(body, &headers, &config).await? {
//!     VerificationOutcome::Success { provider, payload } => {
//!         // hand off to business logic
//!     }
//!     VerificationOutcome::Failure { kind, .. } => {
//!         tracing::info!(code = kind.as_str(), "Webhook rejected");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
pub mod testing;
mod utils;
pub mod webhooks;

// Re-exports for public API
pub use config::{
    LoggingConfig, PipelineConfig, PipelineConfigBuilder, ProviderConfig, WebhookSettings,
    DEFAULT_IDEMPOTENCY_TTL, DEFAULT_STORE_TIMEOUT,
};
pub use error::{Result, TidewayError};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "tideway::webhooks=debug")
/// - `TIDEWAY_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("TIDEWAY_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &LoggingConfig) {
    let env_filter = EnvFilter::new(&config.level);

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
