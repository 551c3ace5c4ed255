use std::time::Duration;

/// The main error type for tideway-webhooks
///
/// Verification failures (bad signatures, stale events, replays) are *not*
/// errors: they are returned as data in
/// [`VerificationOutcome`](crate::webhooks::VerificationOutcome). This type
/// covers the things that are not a verdict about the webhook itself, most
/// importantly an idempotency backend that could not be reached.
#[derive(Debug, thiserror::Error)]
pub enum TidewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Idempotency store did not respond within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl TidewayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn timeout(after: Duration) -> Self {
        Self::Timeout(after)
    }

    /// Whether the failure is about backend availability and may succeed if retried.
    ///
    /// Configuration errors require a config change and are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::Timeout(_))
    }
}

/// Result type alias for tideway-webhooks
pub type Result<T> = std::result::Result<T, TidewayError>;

#[cfg(feature = "idempotency-redis")]
impl From<redis::RedisError> for TidewayError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            TidewayError::ServiceUnavailable(format!("Redis timed out: {}", err))
        } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            TidewayError::ServiceUnavailable(format!("Redis connection error: {}", err))
        } else {
            TidewayError::Internal(format!("Redis error: {}", err))
        }
    }
}
