use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;

use super::compare::{timing_safe_eq_hex, timing_safe_eq_str};
use super::headers::WebhookHeaders;
use super::outcome::{FailureKind, Payload, VerificationOutcome};
use super::provider::{Provider, SignatureScheme};

type HmacSha512 = Hmac<Sha512>;

/// Where to find the signature for a webhook
#[derive(Debug, Clone, Copy)]
pub enum SignatureSource<'a> {
    /// A signature the caller already pulled out of the request
    Explicit(&'a str),
    /// Look the signature header up in the request headers
    Headers(&'a WebhookHeaders),
}

/// Per-call verification options
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Parse the body as JSON after the signature check (default: `true`)
    pub parse_json: bool,
    /// Header to read the signature from instead of the provider default
    pub signature_header: Option<String>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            parse_json: true,
            signature_header: None,
        }
    }
}

impl VerifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_json(mut self, parse_json: bool) -> Self {
        self.parse_json = parse_json;
        self
    }

    pub fn signature_header(mut self, name: impl Into<String>) -> Self {
        self.signature_header = Some(name.into());
        self
    }
}

/// Compute the hex-encoded HMAC-SHA512 of a payload
///
/// This is what Paystack sends in `x-paystack-signature`.
pub fn compute_hmac_sha512_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

impl Provider {
    /// Verify a webhook body against this provider's signature scheme
    ///
    /// `raw_body` must be the exact bytes received on the wire. The body is
    /// only parsed once the signature check has passed.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use tideway_webhooks::webhooks::{Provider, SignatureSource, VerifyOptions};
    ///
    /// let outcome = Provider::Paystack.verify(
    ///     &body,
    ///     &secret,
    ///     SignatureSource::Headers(&headers),
    ///     &VerifyOptions::default(),
    /// );
    /// ```
    pub fn verify(
        &self,
        raw_body: &[u8],
        secret: &SecretString,
        source: SignatureSource<'_>,
        options: &VerifyOptions,
    ) -> VerificationOutcome {
        let header_name = options
            .signature_header
            .as_deref()
            .unwrap_or(self.default_signature_header());

        let signature = match source {
            SignatureSource::Explicit(signature) => Some(signature),
            SignatureSource::Headers(headers) => headers.get(header_name),
        }
        .map(str::trim)
        .filter(|signature| !signature.is_empty());

        let Some(signature) = signature else {
            return VerificationOutcome::failure(
                Some(*self),
                FailureKind::MissingHeader,
                format!("Missing {} header", header_name),
            );
        };

        let is_valid = match self.scheme() {
            SignatureScheme::HmacSha512 => {
                let expected =
                    compute_hmac_sha512_hex(secret.expose_secret().as_bytes(), raw_body);
                timing_safe_eq_hex(&expected, signature)
            }
            SignatureScheme::SecretHash => timing_safe_eq_str(secret.expose_secret(), signature),
        };

        if !is_valid {
            tracing::debug!(
                target: "tideway::webhooks",
                provider = %self,
                "Webhook signature verification failed"
            );
            return VerificationOutcome::failure(
                Some(*self),
                FailureKind::InvalidSignature,
                "Webhook signature does not match",
            );
        }

        match parse_payload(raw_body, options.parse_json) {
            Ok(payload) => VerificationOutcome::Success {
                provider: *self,
                payload,
            },
            Err(e) => {
                // Detailed parse errors stay in the logs
                tracing::debug!(
                    target: "tideway::webhooks",
                    provider = %self,
                    error = %e,
                    "Failed to parse webhook payload"
                );
                VerificationOutcome::failure(
                    Some(*self),
                    FailureKind::InvalidJson,
                    "Webhook body is not valid JSON",
                )
            }
        }
    }
}

fn parse_payload(raw_body: &[u8], parse_json: bool) -> Result<Payload, serde_json::Error> {
    if parse_json {
        serde_json::from_slice(raw_body).map(Payload::Json)
    } else {
        Ok(Payload::Text(String::from_utf8_lossy(raw_body).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAYSTACK_SECRET: &str = "sk_test_paystack_secret";
    const FLUTTERWAVE_HASH: &str = "flw-secret-hash";

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn paystack(body: &[u8], signature: &str) -> VerificationOutcome {
        Provider::Paystack.verify(
            body,
            &secret(PAYSTACK_SECRET),
            SignatureSource::Explicit(signature),
            &VerifyOptions::default(),
        )
    }

    // ============ HMAC provider ============

    #[test]
    fn test_paystack_valid_signature() {
        let body = br#"{"event":"charge.success","data":{"id":1}}"#;
        let signature = compute_hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body);

        let outcome = paystack(body, &signature);
        assert_eq!(
            outcome,
            VerificationOutcome::Success {
                provider: Provider::Paystack,
                payload: Payload::Json(json!({"event": "charge.success", "data": {"id": 1}})),
            }
        );
    }

    #[test]
    fn test_paystack_uppercase_hex_signature() {
        let body = br#"{"event":"charge.success"}"#;
        let signature = compute_hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body).to_uppercase();
        assert!(paystack(body, &signature).is_success());
    }

    #[test]
    fn test_paystack_every_bit_flip_is_rejected() {
        let body = br#"{"event":"charge.success","data":{"id":7}}"#.to_vec();
        let signature = compute_hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), &body);

        for byte in 0..body.len() {
            for bit in 0..8 {
                let mut tampered = body.clone();
                tampered[byte] ^= 1 << bit;
                assert_eq!(
                    paystack(&tampered, &signature).failure_kind(),
                    Some(FailureKind::InvalidSignature),
                    "flipping bit {bit} of byte {byte} should invalidate the signature"
                );
            }
        }
    }

    #[test]
    fn test_paystack_wrong_secret() {
        let body = br#"{"event":"charge.success"}"#;
        let signature = compute_hmac_sha512_hex(b"some-other-secret", body);
        assert_eq!(
            paystack(body, &signature).failure_kind(),
            Some(FailureKind::InvalidSignature)
        );
    }

    #[test]
    fn test_paystack_malformed_signature() {
        let body = br#"{"event":"charge.success"}"#;
        for sig in ["not-hex", "abc", "xyz123", "0g0g0g"] {
            assert_eq!(
                paystack(body, sig).failure_kind(),
                Some(FailureKind::InvalidSignature),
                "Malformed signature '{}' should fail",
                sig
            );
        }
    }

    #[test]
    fn test_paystack_missing_header() {
        let headers = WebhookHeaders::new();
        let outcome = Provider::Paystack.verify(
            b"{}",
            &secret(PAYSTACK_SECRET),
            SignatureSource::Headers(&headers),
            &VerifyOptions::default(),
        );
        match outcome {
            VerificationOutcome::Failure { provider, kind, message } => {
                assert_eq!(provider, Some(Provider::Paystack));
                assert_eq!(kind, FailureKind::MissingHeader);
                assert!(message.contains("x-paystack-signature"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_signature_counts_as_missing() {
        assert_eq!(
            paystack(b"{}", "  ").failure_kind(),
            Some(FailureKind::MissingHeader)
        );
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let body = br#"{"event":"charge.success"}"#;
        let signature = compute_hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body);

        let mut upper = WebhookHeaders::new();
        upper.insert("X-Paystack-Signature", signature.clone());
        let mut lower = WebhookHeaders::new();
        lower.insert("x-paystack-signature", signature);

        let verify = |headers: &WebhookHeaders| {
            Provider::Paystack.verify(
                body,
                &secret(PAYSTACK_SECRET),
                SignatureSource::Headers(headers),
                &VerifyOptions::default(),
            )
        };
        assert_eq!(verify(&upper), verify(&lower));
        assert!(verify(&upper).is_success());
    }

    #[test]
    fn test_repeated_header_uses_first_value() {
        let body = br#"{"event":"charge.success"}"#;
        let signature = compute_hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body);
        let headers: WebhookHeaders = [
            ("x-paystack-signature", signature.as_str()),
            ("x-paystack-signature", "deadbeef"),
        ]
        .into_iter()
        .collect();

        let outcome = Provider::Paystack.verify(
            body,
            &secret(PAYSTACK_SECRET),
            SignatureSource::Headers(&headers),
            &VerifyOptions::default(),
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn test_signature_header_override() {
        let body = br#"{"event":"charge.success"}"#;
        let signature = compute_hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body);
        let mut headers = WebhookHeaders::new();
        headers.insert("X-Custom-Signature", signature);

        let options = VerifyOptions::new().signature_header("x-custom-signature");
        let outcome = Provider::Paystack.verify(
            body,
            &secret(PAYSTACK_SECRET),
            SignatureSource::Headers(&headers),
            &options,
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn test_invalid_json_after_valid_signature() {
        let body = b"not json at all";
        let signature = compute_hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body);
        assert_eq!(
            paystack(body, &signature).failure_kind(),
            Some(FailureKind::InvalidJson)
        );
    }

    #[test]
    fn test_invalid_signature_wins_over_invalid_json() {
        assert_eq!(
            paystack(b"not json", "00").failure_kind(),
            Some(FailureKind::InvalidSignature)
        );
    }

    #[test]
    fn test_parse_json_disabled_returns_text() {
        let body = b"plain text body";
        let signature = compute_hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body);
        let outcome = Provider::Paystack.verify(
            body,
            &secret(PAYSTACK_SECRET),
            SignatureSource::Explicit(&signature),
            &VerifyOptions::new().parse_json(false),
        );
        assert_eq!(
            outcome.payload(),
            Some(&Payload::Text("plain text body".to_string()))
        );
    }

    // ============ Secret-hash provider ============

    #[test]
    fn test_flutterwave_valid_hash() {
        let mut headers = WebhookHeaders::new();
        headers.insert("Verif-Hash", FLUTTERWAVE_HASH);

        let outcome = Provider::Flutterwave.verify(
            br#"{"event":"charge.completed","data":{"id":285959875}}"#,
            &secret(FLUTTERWAVE_HASH),
            SignatureSource::Headers(&headers),
            &VerifyOptions::default(),
        );
        assert_eq!(outcome.provider(), Some(Provider::Flutterwave));
        assert!(outcome.is_success());
    }

    #[test]
    fn test_flutterwave_wrong_hash() {
        let outcome = Provider::Flutterwave.verify(
            b"{}",
            &secret(FLUTTERWAVE_HASH),
            SignatureSource::Explicit("flw-secret-hasX"),
            &VerifyOptions::default(),
        );
        assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidSignature));
    }

    #[test]
    fn test_flutterwave_hash_is_not_bound_to_body() {
        // Any body passes with the right hash; replay protection has to come from the gates.
        for body in [&br#"{"a":1}"#[..], &br#"{"b":2}"#[..]] {
            let outcome = Provider::Flutterwave.verify(
                body,
                &secret(FLUTTERWAVE_HASH),
                SignatureSource::Explicit(FLUTTERWAVE_HASH),
                &VerifyOptions::default(),
            );
            assert!(outcome.is_success());
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn verify_text(body: &[u8], key: &str, signature: &str) -> VerificationOutcome {
            Provider::Paystack.verify(
                body,
                &secret(key),
                SignatureSource::Explicit(signature),
                &VerifyOptions::new().parse_json(false),
            )
        }

        proptest! {
            /// A body signed with a key verifies with the same key.
            #[test]
            fn signed_body_verifies(
                body in prop::collection::vec(any::<u8>(), 0..1024),
                key in "[!-~]{1,64}",
            ) {
                let signature = compute_hmac_sha512_hex(key.as_bytes(), &body);
                prop_assert!(verify_text(&body, &key, &signature).is_success());
            }

            /// Flipping any bit of the body invalidates the signature.
            #[test]
            fn tampered_body_is_rejected(
                body in prop::collection::vec(any::<u8>(), 1..1024),
                flip_idx in any::<prop::sample::Index>(),
                bit in 0u8..8,
                key in "[!-~]{1,64}",
            ) {
                let signature = compute_hmac_sha512_hex(key.as_bytes(), &body);

                let mut tampered = body;
                let idx = flip_idx.index(tampered.len());
                tampered[idx] ^= 1 << bit;

                prop_assert_eq!(
                    verify_text(&tampered, &key, &signature).failure_kind(),
                    Some(FailureKind::InvalidSignature)
                );
            }

            /// A signature made with any other key is rejected.
            #[test]
            fn other_key_is_rejected(
                body in prop::collection::vec(any::<u8>(), 0..1024),
                key in "[!-~]{1,64}",
                other in "[!-~]{1,64}",
            ) {
                prop_assume!(key != other);
                let signature = compute_hmac_sha512_hex(other.as_bytes(), &body);

                prop_assert_eq!(
                    verify_text(&body, &key, &signature).failure_kind(),
                    Some(FailureKind::InvalidSignature)
                );
            }
        }
    }

    #[test]
    fn test_compute_hmac_sha512_hex_shape() {
        let sig = compute_hmac_sha512_hex(b"key", b"payload");
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(sig, compute_hmac_sha512_hex(b"key", b"payload"));
    }
}
