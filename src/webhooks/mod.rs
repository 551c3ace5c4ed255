//! Webhook verification and replay protection.
//!
//! Provides provider detection, signature verification, freshness checking,
//! and idempotency for incoming payment-provider webhooks.

pub mod compare;
mod detect;
mod error;
mod event;
mod headers;
pub mod idempotency;
mod outcome;
mod pipeline;
mod provider;
mod verification;

pub use detect::detect_provider;
pub use error::{VerifiedWebhook, WebhookError};
pub use headers::WebhookHeaders;
pub use idempotency::{IdempotencyBackend, IdempotencyConfig, IdempotencyStore, InMemoryIdempotencyStore};
#[cfg(feature = "idempotency-redis")]
pub use idempotency::RedisIdempotencyStore;
pub use outcome::{FailureKind, Payload, VerificationOutcome};
pub use pipeline::{verify_webhook, verify_webhook_at, verify_webhook_strict};
pub use provider::{Provider, SignatureScheme};
pub use verification::{SignatureSource, VerifyOptions, compute_hmac_sha512_hex};
