//! Test fixtures for generating signed webhook requests
//!
//! This module provides helpers for creating webhook bodies and headers in a
//! consistent way.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::webhooks::{Provider, WebhookHeaders, compute_hmac_sha512_hex};

/// Helper functions for generating fake test data
pub mod fake {
    use super::*;

    /// Generate a fake numeric event id
    pub fn event_id() -> u64 {
        // Keep it within JSON's safe integer range
        Uuid::new_v4().as_u64_pair().0 >> 12
    }

    /// Generate a fake transaction reference
    pub fn reference() -> String {
        format!("ref_{}", &Uuid::new_v4().simple().to_string()[..12])
    }
}

/// Hex HMAC-SHA512 signature Paystack would send for `body`
pub fn sign_paystack(secret: &str, body: &[u8]) -> String {
    compute_hmac_sha512_hex(secret.as_bytes(), body)
}

/// Headers carrying a valid Paystack signature for `body`
pub fn paystack_headers(secret: &str, body: &[u8]) -> WebhookHeaders {
    let mut headers = WebhookHeaders::new();
    headers.insert("content-type", "application/json");
    headers.insert(
        Provider::Paystack.default_signature_header(),
        sign_paystack(secret, body),
    );
    headers
}

/// Headers carrying a Flutterwave secret hash
pub fn flutterwave_headers(secret_hash: &str) -> WebhookHeaders {
    let mut headers = WebhookHeaders::new();
    headers.insert("content-type", "application/json");
    headers.insert(Provider::Flutterwave.default_signature_header(), secret_hash);
    headers
}

/// Builder for a provider event body
#[derive(Debug, Clone)]
pub struct TestEvent {
    provider: Provider,
    event: String,
    id: Option<Value>,
    created_at: Option<DateTime<Utc>>,
}

impl TestEvent {
    /// A `charge.success` event with a generated id, created now
    pub fn paystack() -> Self {
        Self {
            provider: Provider::Paystack,
            event: "charge.success".to_string(),
            id: Some(json!(fake::event_id())),
            created_at: Some(Utc::now()),
        }
    }

    /// A `charge.completed` event with a generated id, created now
    pub fn flutterwave() -> Self {
        Self {
            provider: Provider::Flutterwave,
            event: "charge.completed".to_string(),
            id: Some(json!(fake::event_id())),
            created_at: Some(Utc::now()),
        }
    }

    /// Set the event type
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Set the event id
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Drop the event id from the body
    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    /// Set when the event was created
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Drop the timestamp from the body
    pub fn without_created_at(mut self) -> Self {
        self.created_at = None;
        self
    }

    /// Body as a JSON value
    pub fn to_json(&self) -> Value {
        let mut data = serde_json::Map::new();
        if let Some(id) = &self.id {
            data.insert("id".to_string(), id.clone());
        }
        data.insert("reference".to_string(), json!(fake::reference()));
        if let Some(created_at) = self.created_at {
            data.insert("created_at".to_string(), json!(created_at.to_rfc3339()));
        }

        let mut body = json!({ "event": self.event, "data": data });
        // Flutterwave ids live under data too, references are tx_ref
        if self.provider == Provider::Flutterwave {
            if let Some(data) = body["data"].as_object_mut() {
                if let Some(reference) = data.remove("reference") {
                    data.insert("tx_ref".to_string(), reference);
                }
            }
        }
        body
    }

    /// Body bytes exactly as they would arrive on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }
}
