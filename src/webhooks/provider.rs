use serde::{Deserialize, Serialize};
use std::fmt;

/// How a provider signs its webhooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// Hex-encoded HMAC-SHA512 of the raw body, keyed with the secret key
    HmacSha512,
    /// The header carries a shared secret hash verbatim.
    ///
    /// The body is not covered by the check, so a captured request can be
    /// replayed as-is. Freshness and idempotency gating are the only defence
    /// against that for providers using this scheme.
    SecretHash,
}

/// Supported webhook providers
///
/// Each variant carries its own signature scheme, default signature header
/// and event field lookups; see [`Provider::verify`](Provider::verify).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Paystack,
    Flutterwave,
}

impl Provider {
    /// Providers in the order they are tried during detection
    pub const DETECTION_ORDER: [Provider; 2] = [Provider::Paystack, Provider::Flutterwave];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paystack => "paystack",
            Self::Flutterwave => "flutterwave",
        }
    }

    pub fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Paystack => SignatureScheme::HmacSha512,
            Self::Flutterwave => SignatureScheme::SecretHash,
        }
    }

    /// Header the provider puts its signature in, unless overridden
    pub fn default_signature_header(&self) -> &'static str {
        match self {
            Self::Paystack => "x-paystack-signature",
            Self::Flutterwave => "verif-hash",
        }
    }

    /// Namespaced idempotency key for an event id of this provider
    pub fn event_key(&self, event_id: &str) -> String {
        format!("{}:{}", self.as_str(), event_id)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
