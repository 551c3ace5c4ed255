//! The verification pipeline.
//!
//! Gates run strictly in order and the first failure terminates:
//!
//! 1. **Detecting** which configured provider sent the webhook
//! 2. **Verifying** its signature and parsing the body
//! 3. **Checking freshness** of the event timestamp (if `max_age` is set)
//! 4. **Checking idempotency** of the event id (if a store is set)
//!
//! The event id is only recorded once every earlier gate has passed, so a
//! stale delivery never consumes the id of a later, fresh one.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;

use super::detect::detect_provider;
use super::error::{VerifiedWebhook, WebhookError};
use super::headers::WebhookHeaders;
use super::outcome::{FailureKind, Payload, VerificationOutcome};
use super::provider::Provider;
use super::verification::{SignatureSource, VerifyOptions};
use crate::config::PipelineConfig;
use crate::error::{Result, TidewayError};

/// Verify a webhook against the configured providers and gates
///
/// `raw_body` must be the exact bytes received. Rejections are returned as
/// [`VerificationOutcome::Failure`]; `Err` is reserved for an idempotency
/// store that failed or did not answer within
/// [`store_timeout`](PipelineConfig::store_timeout).
///
/// # Example
///
/// ```rust,ignore
/// use tideway_webhooks::webhooks::{verify_webhook, VerificationOutcome, WebhookHeaders};
///
/// let headers = WebhookHeaders::from(request.headers());
/// match verify_webhook(&body, &headers, &config).await? {
///     VerificationOutcome::Success { provider, payload } => process(provider, payload).await,
///     VerificationOutcome::Failure { kind, .. } => reject(kind.as_str()),
/// }
/// ```
pub async fn verify_webhook(
    raw_body: &[u8],
    headers: &WebhookHeaders,
    config: &PipelineConfig,
) -> Result<VerificationOutcome> {
    verify_webhook_at(raw_body, headers, config, Utc::now()).await
}

/// [`verify_webhook`] with an explicit "now" for the freshness gate
pub async fn verify_webhook_at(
    raw_body: &[u8],
    headers: &WebhookHeaders,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Result<VerificationOutcome> {
    let (provider, provider_config) = match detect_provider(headers, config) {
        Ok(detected) => detected,
        Err(outcome) => {
            tracing::debug!(target: "tideway::webhooks", "No configured provider matched webhook");
            return Ok(outcome);
        }
    };

    let options = VerifyOptions {
        parse_json: config.parse_json,
        signature_header: provider_config.signature_header.clone(),
    };
    let outcome = provider.verify(
        raw_body,
        &provider_config.secret,
        SignatureSource::Headers(headers),
        &options,
    );

    if !outcome.is_success() {
        return Ok(outcome);
    }
    let event = outcome
        .payload()
        .and_then(|payload| gate_view(payload, raw_body));

    if let Some(max_age) = config.max_age {
        if let Some(rejection) = check_freshness(provider, event.as_deref(), max_age, now) {
            return Ok(rejection);
        }
    }

    if let Some(rejection) = check_idempotency(provider, event.as_deref(), config).await? {
        return Ok(rejection);
    }

    tracing::debug!(target: "tideway::webhooks", provider = %provider, "Webhook verified");
    Ok(outcome)
}

/// Like [`verify_webhook`], but rejections come back as [`WebhookError`]
pub async fn verify_webhook_strict(
    raw_body: &[u8],
    headers: &WebhookHeaders,
    config: &PipelineConfig,
) -> std::result::Result<VerifiedWebhook, WebhookError> {
    verify_webhook(raw_body, headers, config).await?.into_result()
}

/// JSON the gates read event fields from
///
/// With JSON parsing disabled the payload is text, so the body is parsed
/// here for the gates only. A body that isn't JSON has no fields to gate on.
fn gate_view<'a>(payload: &'a Payload, raw_body: &[u8]) -> Option<Cow<'a, Value>> {
    match payload {
        Payload::Json(value) => Some(Cow::Borrowed(value)),
        Payload::Text(_) => serde_json::from_slice(raw_body).ok().map(Cow::Owned),
    }
}

fn check_freshness(
    provider: Provider,
    event: Option<&Value>,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Option<VerificationOutcome> {
    let Some(event_time) = event.and_then(|event| provider.event_timestamp(event)) else {
        tracing::debug!(
            target: "tideway::webhooks",
            provider = %provider,
            "No event timestamp, skipping freshness check"
        );
        return None;
    };

    // Negative ages (clock skew) fail to convert and count as fresh
    let age = now.signed_duration_since(event_time).to_std().ok()?;
    if age <= max_age {
        return None;
    }

    tracing::warn!(
        target: "tideway::webhooks",
        provider = %provider,
        age_seconds = age.as_secs(),
        max_age_seconds = max_age.as_secs(),
        "Rejecting stale webhook"
    );

    Some(VerificationOutcome::failure(
        Some(provider),
        FailureKind::StaleEvent,
        format!(
            "Event is {}s old, exceeding the maximum age of {}s",
            age.as_secs(),
            max_age.as_secs()
        ),
    ))
}

async fn check_idempotency(
    provider: Provider,
    event: Option<&Value>,
    config: &PipelineConfig,
) -> Result<Option<VerificationOutcome>> {
    let Some(store) = config.idempotency_store.as_ref() else {
        return Ok(None);
    };

    let Some(event_id) = event.and_then(|event| provider.event_id(event)) else {
        tracing::debug!(
            target: "tideway::webhooks",
            provider = %provider,
            "No event id, skipping idempotency check"
        );
        return Ok(None);
    };

    let key = provider.event_key(&event_id);
    let recorded = tokio::time::timeout(
        config.store_timeout,
        store.record_if_absent(&key, config.idempotency_ttl),
    )
    .await
    .map_err(|_| {
        tracing::error!(
            target: "tideway::webhooks",
            event_key = %key,
            timeout_ms = config.store_timeout.as_millis() as u64,
            "Idempotency store timed out"
        );
        TidewayError::timeout(config.store_timeout)
    })?
    .inspect_err(|e| {
        tracing::error!(
            target: "tideway::webhooks",
            event_key = %key,
            error = %e,
            "Idempotency store failed"
        );
    })?;

    if recorded {
        return Ok(None);
    }

    tracing::warn!(
        target: "tideway::webhooks",
        provider = %provider,
        event_key = %key,
        "Rejecting replayed webhook"
    );

    Ok(Some(VerificationOutcome::failure(
        Some(provider),
        FailureKind::ReplayAttack,
        format!("Event {} was already processed", key),
    )))
}
