use serde::{Deserialize, Serialize};
use std::fmt;

use super::provider::Provider;

/// Why a webhook was rejected
///
/// The string codes returned by [`FailureKind::as_str`] (and used by serde)
/// are stable and safe to match on or forward to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// No configured provider's signature header was present
    UnknownProvider,
    /// The provider was detected but its signature could not be found
    MissingHeader,
    /// The signature did not match the body
    InvalidSignature,
    /// The body passed the signature check but is not valid JSON
    InvalidJson,
    /// The embedded event timestamp is older than the configured maximum age
    StaleEvent,
    /// The event id was already recorded within the idempotency window
    ReplayAttack,
}

impl FailureKind {
    pub const ALL: [FailureKind; 6] = [
        FailureKind::UnknownProvider,
        FailureKind::MissingHeader,
        FailureKind::InvalidSignature,
        FailureKind::InvalidJson,
        FailureKind::StaleEvent,
        FailureKind::ReplayAttack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownProvider => "UNKNOWN_PROVIDER",
            Self::MissingHeader => "MISSING_HEADER",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidJson => "INVALID_JSON",
            Self::StaleEvent => "STALE_EVENT",
            Self::ReplayAttack => "REPLAY_ATTACK",
        }
    }

    /// Structurally valid event rejected by freshness or idempotency policy.
    ///
    /// Everything else means the request is not a genuine webhook (or no
    /// provider is configured for it) and must never be retried automatically.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(self, Self::StaleEvent | Self::ReplayAttack)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verified body of a webhook
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed JSON body (the default)
    Json(serde_json::Value),
    /// Raw UTF-8 text, when JSON parsing was disabled
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

/// Result of running a webhook through verification
///
/// Created fresh for every call. A payload only exists on success, and is
/// only materialized after the signature check passed.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Success {
        provider: Provider,
        payload: Payload,
    },
    Failure {
        /// `None` when the failure happened before a provider was detected
        provider: Option<Provider>,
        kind: FailureKind,
        message: String,
    },
}

impl VerificationOutcome {
    pub(crate) fn failure(
        provider: Option<Provider>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Failure {
            provider,
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn provider(&self) -> Option<Provider> {
        match self {
            Self::Success { provider, .. } => Some(*provider),
            Self::Failure { provider, .. } => *provider,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            Self::Failure { .. } => None,
        }
    }
}
