//! Error-returning surface over [`VerificationOutcome`].
//!
//! Each failure code maps to exactly one [`WebhookError`] variant; there is no
//! other logic here.

use crate::error::TidewayError;

use super::outcome::{FailureKind, Payload, VerificationOutcome};
use super::provider::Provider;

/// A webhook that passed every configured gate
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedWebhook {
    pub provider: Provider,
    pub payload: Payload,
}

/// Rejected webhook, one variant per failure code
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("UNKNOWN_PROVIDER: {message}")]
    UnknownProvider { message: String },

    #[error("MISSING_HEADER: {message}")]
    MissingHeader {
        provider: Option<Provider>,
        message: String,
    },

    #[error("INVALID_SIGNATURE: {message}")]
    InvalidSignature {
        provider: Option<Provider>,
        message: String,
    },

    #[error("INVALID_JSON: {message}")]
    InvalidJson {
        provider: Option<Provider>,
        message: String,
    },

    #[error("STALE_EVENT: {message}")]
    StaleEvent {
        provider: Option<Provider>,
        message: String,
    },

    #[error("REPLAY_ATTACK: {message}")]
    ReplayAttack {
        provider: Option<Provider>,
        message: String,
    },

    /// The idempotency backend failed; this is not a verdict on the webhook
    #[error(transparent)]
    Backend(#[from] TidewayError),
}

impl WebhookError {
    /// Failure code, or `None` for backend errors
    pub fn code(&self) -> Option<FailureKind> {
        match self {
            Self::UnknownProvider { .. } => Some(FailureKind::UnknownProvider),
            Self::MissingHeader { .. } => Some(FailureKind::MissingHeader),
            Self::InvalidSignature { .. } => Some(FailureKind::InvalidSignature),
            Self::InvalidJson { .. } => Some(FailureKind::InvalidJson),
            Self::StaleEvent { .. } => Some(FailureKind::StaleEvent),
            Self::ReplayAttack { .. } => Some(FailureKind::ReplayAttack),
            Self::Backend(_) => None,
        }
    }
}

impl VerificationOutcome {
    /// Convert into `Ok(VerifiedWebhook)` or the matching [`WebhookError`]
    pub fn into_result(self) -> Result<VerifiedWebhook, WebhookError> {
        let (provider, kind, message) = match self {
            Self::Success { provider, payload } => {
                return Ok(VerifiedWebhook { provider, payload });
            }
            Self::Failure {
                provider,
                kind,
                message,
            } => (provider, kind, message),
        };

        Err(match kind {
            FailureKind::UnknownProvider => WebhookError::UnknownProvider { message },
            FailureKind::MissingHeader => WebhookError::MissingHeader { provider, message },
            FailureKind::InvalidSignature => WebhookError::InvalidSignature { provider, message },
            FailureKind::InvalidJson => WebhookError::InvalidJson { provider, message },
            FailureKind::StaleEvent => WebhookError::StaleEvent { provider, message },
            FailureKind::ReplayAttack => WebhookError::ReplayAttack { provider, message },
        })
    }
}
