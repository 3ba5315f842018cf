//! End-to-end coverage of the order → checkout → verify lifecycle over the
//! real services and in-memory adapters.

mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;

use backend::domain::ports::{
    GatewayOrder, OrderDraft, OrderRepository, PaymentGateway, PaymentGatewayError,
    VerifyPaymentRequest, VerificationService,
};
use backend::domain::{OrderId, OrderStatus, PackageId, PaymentReference, RecordedOutcome,
    Signature, VerificationOutcome};

use common::{PROVIDER, TEST_SECRET, harness, test_app};

/// Independent recomputation of the documented signature scheme:
/// hex(HMAC-SHA256(secret, "{order_id}|{payment_reference}")).
fn sign(order_id: &str, payment_reference: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(TEST_SECRET.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_reference.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn create_order_body() -> Value {
    json!({
        "amount": 12.00,
        "currency": "USD",
        "packageId": "starter-pack",
    })
}

async fn created_order_id<S>(app: &S) -> String
where
    S: actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
{
    let request = test::TestRequest::post()
        .uri(&format!("/api/payments/{PROVIDER}/create-order"))
        .set_json(create_order_body())
        .to_request();
    let response = test::call_service(app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload: Value = test::read_body_json(response).await;
    assert_eq!(payload.get("amount").and_then(Value::as_i64), Some(996));
    assert_eq!(payload.get("currency").and_then(Value::as_str), Some("INR"));
    payload
        .get("id")
        .and_then(Value::as_str)
        .expect("order id in response")
        .to_owned()
}

#[actix_web::test]
async fn verified_payment_credits_exactly_once_across_replays() {
    let harness = harness();
    let ledger = harness.ledger.clone();
    let app = test::init_service(test_app(harness.state)).await;

    let order_id = created_order_id(&app).await;
    let verify_body = json!({
        "orderId": order_id,
        "paymentReference": "pay_123",
        "signature": sign(&order_id, "pay_123"),
        "packageId": "starter-pack",
    });

    for _ in 0..2 {
        let request = test::TestRequest::post()
            .uri(&format!("/api/payments/{PROVIDER}/verify"))
            .set_json(verify_body.clone())
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload: Value = test::read_body_json(response).await;
        assert_eq!(payload.get("success").and_then(Value::as_bool), Some(true));
    }

    let grants = ledger.grants().await;
    assert_eq!(grants.len(), 1, "replay must not credit a second time");
    assert_eq!(grants[0].order_id.as_ref(), order_id);
    assert_eq!(grants[0].package_id.as_ref(), "starter-pack");

    let stored = harness
        .store
        .find(&OrderId::new(order_id).expect("valid id"))
        .await
        .expect("store read")
        .expect("order present");
    assert_eq!(stored.status, OrderStatus::Verified);
}

#[actix_web::test]
async fn tampered_signatures_fail_and_record_the_attempt() {
    let harness = harness();
    let ledger = harness.ledger.clone();
    let app = test::init_service(test_app(harness.state)).await;

    let order_id = created_order_id(&app).await;
    let request = test::TestRequest::post()
        .uri(&format!("/api/payments/{PROVIDER}/verify"))
        .set_json(json!({
            "orderId": order_id,
            "paymentReference": "pay_123",
            "signature": "tampered-signature",
            "packageId": "starter-pack",
        }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload: Value = test::read_body_json(response).await;
    assert_eq!(payload.get("success").and_then(Value::as_bool), Some(false));

    assert!(ledger.grants().await.is_empty(), "failed attempts never credit");
    let parsed_id = OrderId::new(order_id).expect("valid id");
    let record = harness
        .store
        .verification(&parsed_id)
        .await
        .expect("store read")
        .expect("attempt recorded");
    assert_eq!(record.outcome, RecordedOutcome::Failed);
    let stored = harness
        .store
        .find(&parsed_id)
        .await
        .expect("store read")
        .expect("order present");
    assert_eq!(stored.status, OrderStatus::Failed);
}

#[actix_web::test]
async fn a_failed_order_replays_its_failure_even_for_a_correct_signature() {
    let harness = harness();
    let app = test::init_service(test_app(harness.state)).await;

    let order_id = created_order_id(&app).await;
    let tampered = test::TestRequest::post()
        .uri(&format!("/api/payments/{PROVIDER}/verify"))
        .set_json(json!({
            "orderId": order_id,
            "paymentReference": "pay_123",
            "signature": "tampered-signature",
            "packageId": "starter-pack",
        }))
        .to_request();
    let first = test::call_service(&app, tampered).await;
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    // Terminal means terminal: the real signature cannot resurrect the order.
    let genuine = test::TestRequest::post()
        .uri(&format!("/api/payments/{PROVIDER}/verify"))
        .set_json(json!({
            "orderId": order_id,
            "paymentReference": "pay_123",
            "signature": sign(&order_id, "pay_123"),
            "packageId": "starter-pack",
        }))
        .to_request();
    let second = test::call_service(&app, genuine).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert!(harness.ledger.grants().await.is_empty());
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let harness = harness();
    let app = test::init_service(test_app(harness.state)).await;
    let request = test::TestRequest::post()
        .uri(&format!("/api/payments/{PROVIDER}/verify"))
        .set_json(json!({
            "orderId": "order_unknown",
            "paymentReference": "pay_123",
            "signature": sign("order_unknown", "pay_123"),
            "packageId": "starter-pack",
        }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload: Value = test::read_body_json(response).await;
    assert_eq!(payload.get("success").and_then(Value::as_bool), Some(false));
}

#[actix_web::test]
async fn racing_verifications_settle_on_one_credit() {
    let harness = harness();
    let app = test::init_service(test_app(harness.state.clone())).await;
    let order_id = created_order_id(&app).await;

    let request = VerifyPaymentRequest {
        order_id: OrderId::new(order_id.clone()).expect("valid id"),
        payment_reference: PaymentReference::new("pay_123").expect("valid reference"),
        signature: Signature::new(sign(&order_id, "pay_123")).expect("non-empty"),
        package_id: PackageId::new("starter-pack").expect("valid package"),
        subject_id: None,
    };
    let verification = harness.state.verification.clone();
    let (left, right) = tokio::join!(
        verification.verify(request.clone()),
        verification.verify(request.clone()),
    );
    let outcomes = [
        left.expect("no infrastructure failure"),
        right.expect("no infrastructure failure"),
    ];
    for outcome in &outcomes {
        assert!(matches!(outcome, VerificationOutcome::Verified { .. }));
    }
    let fresh = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, VerificationOutcome::Verified { replayed: false }))
        .count();
    assert_eq!(fresh, 1, "exactly one attempt wins the transition");
    assert_eq!(harness.ledger.grants().await.len(), 1);
}

#[actix_web::test]
async fn idempotency_keys_replay_the_same_order() {
    let harness = harness();
    let app = test::init_service(test_app(harness.state)).await;
    let key = uuid::Uuid::new_v4().to_string();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let request = test::TestRequest::post()
            .uri(&format!("/api/payments/{PROVIDER}/create-order"))
            .insert_header(("Idempotency-Key", key.as_str()))
            .set_json(create_order_body())
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload: Value = test::read_body_json(response).await;
        ids.push(
            payload
                .get("id")
                .and_then(Value::as_str)
                .expect("order id")
                .to_owned(),
        );
    }
    assert_eq!(ids[0], ids[1], "a retried key must not mint a duplicate");

    let conflicting = test::TestRequest::post()
        .uri(&format!("/api/payments/{PROVIDER}/create-order"))
        .insert_header(("Idempotency-Key", key.as_str()))
        .set_json(json!({
            "amount": 30.00,
            "currency": "USD",
            "packageId": "scholar-pack",
        }))
        .to_request();
    let response = test::call_service(&app, conflicting).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn checkout_descriptor_reflects_the_created_order() {
    let harness = harness();
    let app = test::init_service(test_app(harness.state)).await;
    let order_id = created_order_id(&app).await;

    let request = test::TestRequest::get()
        .uri(&format!(
            "/api/payments/{PROVIDER}/orders/{order_id}/checkout"
        ))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload: Value = test::read_body_json(response).await;
    assert_eq!(
        payload.get("orderId").and_then(Value::as_str),
        Some(order_id.as_str())
    );
    assert_eq!(payload.get("amount").and_then(Value::as_i64), Some(996));
    assert_eq!(
        payload
            .get("methods")
            .and_then(Value::as_array)
            .map(Vec::len),
        Some(4)
    );
}

#[actix_web::test]
async fn invalid_amounts_fail_for_any_currency_and_package() {
    let harness = harness();
    let app = test::init_service(test_app(harness.state)).await;
    for (amount, currency, package) in [
        (json!(0), "USD", "starter-pack"),
        (json!(-5.00), "EUR", "scholar-pack"),
        (json!(0), "INR", "starter-pack"),
    ] {
        let request = test::TestRequest::post()
            .uri(&format!("/api/payments/{PROVIDER}/create-order"))
            .set_json(json!({
                "amount": amount,
                "currency": currency,
                "packageId": package,
            }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

/// Gateway stub refusing every registration with a timeout.
struct TimedOutGateway;

#[async_trait]
impl PaymentGateway for TimedOutGateway {
    async fn register_order(
        &self,
        _draft: &OrderDraft,
    ) -> Result<GatewayOrder, PaymentGatewayError> {
        Err(PaymentGatewayError::timeout("deadline exceeded"))
    }
}

#[actix_web::test]
async fn gateway_timeouts_surface_as_504() {
    let harness = common::harness_with(
        TimedOutGateway,
        std::sync::Arc::new(backend::domain::ports::FixtureIdentityVerifier::default()),
    );
    let app = test::init_service(test_app(harness.state)).await;
    let request = test::TestRequest::post()
        .uri(&format!("/api/payments/{PROVIDER}/create-order"))
        .set_json(create_order_body())
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}
