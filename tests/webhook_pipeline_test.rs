use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tideway_webhooks::testing::{TestEvent, flutterwave_headers, paystack_headers, sign_paystack};
use tideway_webhooks::webhooks::{
    FailureKind, InMemoryIdempotencyStore, Payload, Provider, VerificationOutcome, WebhookError,
    WebhookHeaders, verify_webhook, verify_webhook_strict,
};
use tideway_webhooks::{PipelineConfig, ProviderConfig, TidewayError};

const PAYSTACK_SECRET: &str = "sk_test_integration";
const FLUTTERWAVE_HASH: &str = "flw-integration-hash";

fn config_with_store(store: Arc<InMemoryIdempotencyStore>) -> PipelineConfig {
    PipelineConfig::builder()
        .paystack(PAYSTACK_SECRET)
        .flutterwave(FLUTTERWAVE_HASH)
        .idempotency_store(store)
        .max_age(Duration::from_secs(300))
        .build()
}

#[tokio::test]
async fn test_paystack_charge_success_two_hours_old_is_stale() {
    let config = PipelineConfig::builder()
        .paystack(PAYSTACK_SECRET)
        .max_age(Duration::from_secs(300))
        .build();
    let body = format!(
        r#"{{"event":"charge.success","data":{{"id":1,"created_at":"{}"}}}}"#,
        (Utc::now() - ChronoDuration::hours(2)).to_rfc3339()
    );

    let outcome = verify_webhook(
        body.as_bytes(),
        &paystack_headers(PAYSTACK_SECRET, body.as_bytes()),
        &config,
    )
    .await
    .unwrap();

    assert_eq!(outcome.failure_kind(), Some(FailureKind::StaleEvent));
}

#[tokio::test]
async fn test_paystack_charge_success_five_seconds_old_is_accepted() {
    let config = PipelineConfig::builder()
        .paystack(PAYSTACK_SECRET)
        .max_age(Duration::from_secs(300))
        .build();
    let body = format!(
        r#"{{"event":"charge.success","data":{{"id":1,"created_at":"{}"}}}}"#,
        (Utc::now() - ChronoDuration::seconds(5)).to_rfc3339()
    );

    let outcome = verify_webhook(
        body.as_bytes(),
        &paystack_headers(PAYSTACK_SECRET, body.as_bytes()),
        &config,
    )
    .await
    .unwrap();

    match outcome {
        VerificationOutcome::Success { provider, payload } => {
            assert_eq!(provider, Provider::Paystack);
            let json = payload.into_json().unwrap();
            assert_eq!(json["event"], "charge.success");
            assert_eq!(json["data"]["id"], 1);
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_identical_requests_second_is_replay() {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let config = config_with_store(store.clone());
    let body = TestEvent::paystack().to_bytes();
    let headers = paystack_headers(PAYSTACK_SECRET, &body);

    let first = verify_webhook(&body, &headers, &config).await.unwrap();
    let second = verify_webhook(&body, &headers, &config).await.unwrap();

    assert!(first.is_success());
    assert_eq!(second.failure_kind(), Some(FailureKind::ReplayAttack));

    store.shutdown().await;
}

#[tokio::test]
async fn test_fresh_retry_after_stale_rejection_succeeds() {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let config = config_with_store(store.clone());

    let stale = TestEvent::paystack()
        .with_id(99)
        .with_created_at(Utc::now() - ChronoDuration::hours(1))
        .to_bytes();
    let outcome = verify_webhook(&stale, &paystack_headers(PAYSTACK_SECRET, &stale), &config)
        .await
        .unwrap();
    assert_eq!(outcome.failure_kind(), Some(FailureKind::StaleEvent));

    let fresh = TestEvent::paystack().with_id(99).to_bytes();
    let outcome = verify_webhook(&fresh, &paystack_headers(PAYSTACK_SECRET, &fresh), &config)
        .await
        .unwrap();
    assert!(outcome.is_success(), "fresh retry rejected: {:?}", outcome);

    store.shutdown().await;
}

#[tokio::test]
async fn test_no_known_header_with_one_provider_is_unknown_provider() {
    let config = PipelineConfig::builder().paystack(PAYSTACK_SECRET).build();
    let mut headers = WebhookHeaders::new();
    headers.insert("content-type", "application/json");
    headers.insert("x-some-other-signature", "abc");

    let outcome = verify_webhook(b"{}", &headers, &config).await.unwrap();

    assert_eq!(
        outcome,
        VerificationOutcome::Failure {
            provider: None,
            kind: FailureKind::UnknownProvider,
            message: "No configured webhook provider matched the request headers".to_string(),
        }
    );
}

#[tokio::test]
async fn test_header_case_does_not_change_outcome() {
    let config = PipelineConfig::builder().paystack(PAYSTACK_SECRET).build();
    let body = TestEvent::paystack().with_id(5).to_bytes();
    let signature = sign_paystack(PAYSTACK_SECRET, &body);

    let mut upper = WebhookHeaders::new();
    upper.insert("X-Paystack-Signature", signature.clone());
    let mut lower = WebhookHeaders::new();
    lower.insert("x-paystack-signature", signature);

    let a = verify_webhook(&body, &upper, &config).await.unwrap();
    let b = verify_webhook(&body, &lower, &config).await.unwrap();
    assert_eq!(a, b);
    assert!(a.is_success());
}

#[tokio::test]
async fn test_body_must_be_the_exact_wire_bytes() {
    let config = PipelineConfig::builder().paystack(PAYSTACK_SECRET).build();
    let body = br#"{"event": "charge.success",  "data": {"id": 3}}"#;
    let headers = paystack_headers(PAYSTACK_SECRET, body);

    // Re-serializing the same JSON changes the bytes the signature covers
    let reserialized = serde_json::to_vec(&serde_json::from_slice::<serde_json::Value>(body).unwrap())
        .unwrap();
    assert_ne!(reserialized.as_slice(), &body[..]);

    let outcome = verify_webhook(&reserialized, &headers, &config).await.unwrap();
    assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidSignature));

    let outcome = verify_webhook(body, &headers, &config).await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_flutterwave_end_to_end() {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let config = config_with_store(store.clone());
    let body = TestEvent::flutterwave().with_id(285959875).to_bytes();
    let headers = flutterwave_headers(FLUTTERWAVE_HASH);

    let first = verify_webhook(&body, &headers, &config).await.unwrap();
    assert_eq!(first.provider(), Some(Provider::Flutterwave));
    assert!(first.is_success());

    // The hash doesn't cover the body, so a captured request replays verbatim;
    // only the idempotency gate stops it.
    let replay = verify_webhook(&body, &headers, &config).await.unwrap();
    assert_eq!(replay.failure_kind(), Some(FailureKind::ReplayAttack));

    let wrong = verify_webhook(&body, &flutterwave_headers("guess"), &config)
        .await
        .unwrap();
    assert_eq!(wrong.failure_kind(), Some(FailureKind::InvalidSignature));

    store.shutdown().await;
}

#[tokio::test]
async fn test_unconfigured_provider_header_is_unknown_not_missing() {
    let config = PipelineConfig::builder().paystack(PAYSTACK_SECRET).build();
    let body = TestEvent::flutterwave().to_bytes();

    let outcome = verify_webhook(&body, &flutterwave_headers(FLUTTERWAVE_HASH), &config)
        .await
        .unwrap();
    assert_eq!(outcome.failure_kind(), Some(FailureKind::UnknownProvider));
    assert_eq!(outcome.provider(), None);
}

#[tokio::test]
async fn test_webhook_signed_with_empty_key_is_not_accepted() {
    let config = PipelineConfig::builder().paystack("").build();
    assert!(matches!(config.validate(), Err(TidewayError::Config(_))));

    let body = TestEvent::paystack().to_bytes();
    let forged = paystack_headers("", &body);

    let outcome = verify_webhook(&body, &forged, &config).await.unwrap();
    assert!(!outcome.is_success());
    assert_eq!(outcome.failure_kind(), Some(FailureKind::UnknownProvider));
}

#[tokio::test]
async fn test_empty_secret_does_not_shadow_other_provider() {
    let config = PipelineConfig::builder()
        .paystack("")
        .flutterwave(FLUTTERWAVE_HASH)
        .build();
    let body = TestEvent::paystack().to_bytes();

    let forged = paystack_headers("", &body);
    let outcome = verify_webhook(&body, &forged, &config).await.unwrap();
    assert_eq!(outcome.failure_kind(), Some(FailureKind::UnknownProvider));

    let outcome = verify_webhook(&body, &flutterwave_headers(FLUTTERWAVE_HASH), &config)
        .await
        .unwrap();
    assert_eq!(outcome.provider(), Some(Provider::Flutterwave));
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_overridden_signature_header() {
    let config = PipelineConfig::builder()
        .provider(
            Provider::Paystack,
            ProviderConfig::new(PAYSTACK_SECRET).with_signature_header("X-Relayed-Signature"),
        )
        .build();
    let body = TestEvent::paystack().to_bytes();
    let mut headers = WebhookHeaders::new();
    headers.insert("x-relayed-signature", sign_paystack(PAYSTACK_SECRET, &body));

    let outcome = verify_webhook(&body, &headers, &config).await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_raw_text_payload_when_json_disabled() {
    let config = PipelineConfig::builder()
        .paystack(PAYSTACK_SECRET)
        .parse_json(false)
        .build();
    let body = b"event=charge.success&id=1";

    let outcome = verify_webhook(body, &paystack_headers(PAYSTACK_SECRET, body), &config)
        .await
        .unwrap();
    assert_eq!(
        outcome.payload(),
        Some(&Payload::Text("event=charge.success&id=1".to_string()))
    );
}

#[tokio::test]
async fn test_strict_api() {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let config = config_with_store(store.clone());
    let body = TestEvent::paystack().to_bytes();
    let headers = paystack_headers(PAYSTACK_SECRET, &body);

    let verified = verify_webhook_strict(&body, &headers, &config).await.unwrap();
    assert_eq!(verified.provider, Provider::Paystack);

    match verify_webhook_strict(&body, &headers, &config).await {
        Err(WebhookError::ReplayAttack { provider, .. }) => {
            assert_eq!(provider, Some(Provider::Paystack));
        }
        other => panic!("expected replay error, got {:?}", other),
    }

    let bad = paystack_headers("not-the-secret", &body);
    let err = verify_webhook_strict(&body, &bad, &config).await.unwrap_err();
    assert_eq!(err.code(), Some(FailureKind::InvalidSignature));

    store.shutdown().await;
}

#[tokio::test]
async fn test_missing_secret_material_fails_validation() {
    let err = PipelineConfig::builder().build().validate().unwrap_err();
    assert!(matches!(err, TidewayError::Config(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_deliveries_accept_exactly_one() {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let config = Arc::new(config_with_store(store.clone()));
    let body = Arc::new(TestEvent::paystack().to_bytes());
    let headers = Arc::new(paystack_headers(PAYSTACK_SECRET, &body));

    let mut handles = vec![];
    for _ in 0..32 {
        let (config, body, headers) = (config.clone(), body.clone(), headers.clone());
        handles.push(tokio::spawn(async move {
            verify_webhook(&body, &headers, &config).await.unwrap()
        }));
    }

    let mut accepted = 0;
    let mut replays = 0;
    for handle in handles {
        match handle.await.unwrap().failure_kind() {
            None => accepted += 1,
            Some(FailureKind::ReplayAttack) => replays += 1,
            Some(other) => panic!("unexpected failure {other}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(replays, 31);

    store.shutdown().await;
}
