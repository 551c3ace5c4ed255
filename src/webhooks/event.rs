//! Provider-specific lookups of the event id and timestamp in a verified payload.
//!
//! Each field is looked up at a primary location first and a fallback second.
//!
//! | Provider    | Id                            | Timestamp                            |
//! |-------------|-------------------------------|--------------------------------------|
//! | Paystack    | `data.id`, `data.reference`   | `data.created_at`, `data.createdAt`  |
//! | Flutterwave | `data.id`, `data.tx_ref`      | `data.created_at`, `created_at`      |

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::provider::Provider;

/// Epoch values above this are taken to be milliseconds
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

impl Provider {
    fn id_fields(&self) -> [&'static str; 2] {
        match self {
            Self::Paystack => ["/data/id", "/data/reference"],
            Self::Flutterwave => ["/data/id", "/data/tx_ref"],
        }
    }

    fn timestamp_fields(&self) -> [&'static str; 2] {
        match self {
            Self::Paystack => ["/data/created_at", "/data/createdAt"],
            Self::Flutterwave => ["/data/created_at", "/created_at"],
        }
    }

    /// Event identifier, if the payload carries one
    ///
    /// Strings and integers are accepted; anything else counts as absent.
    pub fn event_id(&self, payload: &Value) -> Option<String> {
        self.id_fields()
            .iter()
            .find_map(|field| payload.pointer(field).and_then(id_from_value))
    }

    /// When the provider says the event happened, if the payload says so
    pub fn event_timestamp(&self, payload: &Value) -> Option<DateTime<Utc>> {
        self.timestamp_fields()
            .iter()
            .find_map(|field| payload.pointer(field).and_then(timestamp_from_value))
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| s.parse::<i64>().ok().and_then(from_epoch))
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_to_epoch))
            .and_then(from_epoch),
        _ => None,
    }
}

/// Whole epoch value of a float, or `None` if it can't be one
fn float_to_epoch(value: f64) -> Option<i64> {
    // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && in_range).then_some(value as i64)
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if !(-MILLIS_THRESHOLD..MILLIS_THRESHOLD).contains(&value) {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}
