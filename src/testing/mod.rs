//! Testing utilities for webhook integrations
//!
//! Framework adapters and applications can use these to produce correctly
//! signed requests without talking to a real provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use tideway_webhooks::testing::{TestEvent, paystack_headers};
//! use tideway_webhooks::webhooks::verify_webhook;
//!
//! #[tokio::test]
//! async fn test_charge_success() {
//!     let body = TestEvent::paystack().with_id(1).to_bytes();
//!     let headers = paystack_headers("sk_test", &body);
//!
//!     let outcome = verify_webhook(&body, &headers, &config).await.unwrap();
//!     assert!(outcome.is_success());
//! }
//! ```

mod fixtures;

pub use fixtures::{TestEvent, fake, flutterwave_headers, paystack_headers, sign_paystack};
