use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use souk_api::{app, AppState};
use souk_booking::memory::MemoryBookingStore;
use souk_booking::{BookingService, CancellationPolicy};
use souk_catalog::{ListingSummary, MemoryListingDirectory, PricingModel};
use souk_core::lock::MemorySlotLock;
use souk_payment::memory::MemoryPaymentStore;
use souk_payment::{signature, FeeRates, MockGateway, PaymentConfig, PaymentService};
use tower::ServiceExt;
use uuid::Uuid;

const KEY_SECRET: &str = "key_secret_test";
const WEBHOOK_SECRET: &str = "webhook_secret_test";

struct TestApp {
    router: Router,
    listing_id: Uuid,
    provider_id: Uuid,
}

async fn spawn_app() -> TestApp {
    let bookings = Arc::new(MemoryBookingStore::new());
    let payments = Arc::new(MemoryPaymentStore::new(bookings.table()));
    let listings = Arc::new(MemoryListingDirectory::new());
    let lock = Arc::new(MemorySlotLock::new());

    let listing_id = Uuid::new_v4();
    let provider_id = Uuid::new_v4();
    listings
        .upsert_listing(ListingSummary {
            id: listing_id,
            provider_id,
            title: "Harbor studio".into(),
            is_active: true,
            pricing: PricingModel {
                hourly_rate: Some(dec!(100)),
                ..PricingModel::default()
            },
            deposit_amount: dec!(40),
        })
        .await;
    listings.set_provider_approved(provider_id, true).await;

    let booking_service = Arc::new(BookingService::new(
        bookings.clone(),
        listings,
        lock.clone(),
        CancellationPolicy::default(),
        Duration::from_secs(30),
    ));
    let payment_service = Arc::new(PaymentService::new(
        payments,
        bookings,
        Arc::new(MockGateway),
        lock,
        PaymentConfig {
            currency: "INR".into(),
            key_secret: KEY_SECRET.into(),
            webhook_secret: WEBHOOK_SECRET.into(),
            rates: FeeRates::default(),
            slot_lock_ttl: Duration::from_secs(30),
        },
    ));

    TestApp {
        router: app(AppState {
            bookings: booking_service,
            payments: payment_service,
        }),
        listing_id,
        provider_id,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn request(method: Method, uri: &str, user: Option<Uuid>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user.to_string());
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn booking_body(listing_id: Uuid, start_hours: i64, duration_hours: i64) -> Value {
    let start = Utc::now() + ChronoDuration::hours(start_hours);
    json!({
        "listing_id": listing_id,
        "start_at": start.to_rfc3339(),
        "end_at": (start + ChronoDuration::hours(duration_hours)).to_rfc3339(),
    })
}

async fn create_booking(app: &TestApp, customer: Uuid, start_hours: i64) -> Value {
    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/v1/bookings",
            Some(customer),
            Some(&booking_body(app.listing_id, start_hours, 3)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "booking failed: {body}");
    body
}

async fn create_order(app: &TestApp, customer: Uuid, booking_id: &str) -> Value {
    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/v1/payments/create-order",
            Some(customer),
            Some(&json!({ "booking_id": booking_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "order failed: {body}");
    body
}

async fn capture(app: &TestApp, order_ref: &str, payment_ref: &str) -> Value {
    let message = signature::capture_message(order_ref, payment_ref);
    let callback = json!({
        "order_ref": order_ref,
        "payment_ref": payment_ref,
        "signature": signature::sign(KEY_SECRET, message.as_bytes()),
    });
    let (status, body) = send(
        &app.router,
        request(Method::POST, "/v1/payments/success", None, Some(&callback)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "capture failed: {body}");
    body
}

#[tokio::test]
async fn checkout_flow_confirms_the_booking() {
    let app = spawn_app().await;
    let customer = Uuid::new_v4();

    let booking = create_booking(&app, customer, 72).await;
    assert_eq!(booking["status"], "pending_payment");
    assert_eq!(booking["payment_status"], "pending");
    assert_eq!(booking["total_amount"], "300.00");
    assert_eq!(booking["provider_id"], json!(app.provider_id));

    let order = create_order(&app, customer, booking["id"].as_str().unwrap()).await;
    assert_eq!(order["amount"], "300.00");
    assert_eq!(order["platform_fee"], "9.00");
    assert_eq!(order["gateway_fee"], "6.00");
    assert_eq!(order["payout_amount"], "285.00");
    let order_ref = order["order_ref"].as_str().unwrap();
    assert!(order_ref.starts_with("order_"));

    let payment = capture(&app, order_ref, "pay_live_1").await;
    assert_eq!(payment["status"], "captured");
    assert_eq!(payment["payment_ref"], "pay_live_1");

    let (status, fetched) = send(
        &app.router,
        request(
            Method::GET,
            &format!("/v1/bookings/{}", booking["id"].as_str().unwrap()),
            Some(customer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "confirmed");
    assert_eq!(fetched["payment_status"], "paid");
}

#[tokio::test]
async fn identity_header_is_required() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/v1/bookings",
            None,
            Some(&booking_body(app.listing_id, 72, 3)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("X-User-Id"));

    let mut bad = request(
        Method::POST,
        "/v1/bookings",
        None,
        Some(&booking_body(app.listing_id, 72, 3)),
    );
    bad.headers_mut()
        .insert("X-User-Id", "not-a-uuid".parse().unwrap());
    let (status, _) = send(&app.router, bad).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn overlapping_booking_is_rejected_with_conflict() {
    let app = spawn_app().await;
    create_booking(&app, Uuid::new_v4(), 72).await;

    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/v1/bookings",
            Some(Uuid::new_v4()),
            Some(&booking_body(app.listing_id, 72, 3)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Requested dates are no longer available");
}

#[tokio::test]
async fn availability_probe_reflects_bookings() {
    let app = spawn_app().await;
    let start = Utc::now() + ChronoDuration::hours(72);
    let end = start + ChronoDuration::hours(3);
    let probe = format!(
        "/v1/bookings/availability/check?listing_id={}&start_at={}&end_at={}",
        app.listing_id,
        start.to_rfc3339_opts(SecondsFormat::Secs, true),
        end.to_rfc3339_opts(SecondsFormat::Secs, true),
    );

    let (status, body) = send(&app.router, request(Method::GET, &probe, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], json!(true));

    create_booking(&app, Uuid::new_v4(), 72).await;

    let (status, body) = send(&app.router, request(Method::GET, &probe, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], json!(false));
}

#[tokio::test]
async fn backwards_interval_is_a_bad_request() {
    let app = spawn_app().await;
    let start = Utc::now() + ChronoDuration::hours(72);
    let probe = format!(
        "/v1/bookings/availability/check?listing_id={}&start_at={}&end_at={}",
        app.listing_id,
        start.to_rfc3339_opts(SecondsFormat::Secs, true),
        (start - ChronoDuration::hours(1)).to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    let (status, _) = send(&app.router, request(Method::GET, &probe, None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn strangers_get_not_found_for_foreign_bookings() {
    let app = spawn_app().await;
    let booking = create_booking(&app, Uuid::new_v4(), 72).await;

    let (status, _) = send(
        &app.router,
        request(
            Method::GET,
            &format!("/v1/bookings/{}", booking["id"].as_str().unwrap()),
            Some(Uuid::new_v4()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancellation_applies_the_refund_policy() {
    let app = spawn_app().await;
    let customer = Uuid::new_v4();
    // 30 hours out lands in the half-refund band.
    let booking = create_booking(&app, customer, 30).await;

    let (status, cancelled) = send(
        &app.router,
        request(
            Method::POST,
            &format!("/v1/bookings/{}/cancel", booking["id"].as_str().unwrap()),
            Some(customer),
            Some(&json!({ "reason": "provider asked to reschedule" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["refund_amount"], "150.00");
    assert_eq!(
        cancelled["cancellation_reason"],
        "provider asked to reschedule"
    );
}

#[tokio::test]
async fn provider_runs_the_job_through_its_states() {
    let app = spawn_app().await;
    let customer = Uuid::new_v4();
    let booking = create_booking(&app, customer, 72).await;
    let id = booking["id"].as_str().unwrap().to_string();

    let order = create_order(&app, customer, &id).await;
    capture(&app, order["order_ref"].as_str().unwrap(), "pay_live_1").await;

    for (to, expected) in [("in_progress", StatusCode::OK), ("completed", StatusCode::OK)] {
        let (status, body) = send(
            &app.router,
            request(
                Method::PUT,
                &format!("/v1/bookings/{id}/status"),
                Some(app.provider_id),
                Some(&json!({ "status": to })),
            ),
        )
        .await;
        assert_eq!(status, expected, "moving to {to}: {body}");
        assert_eq!(body["status"], to);
    }

    // Payment-driven edges are not reachable through the status endpoint.
    let (status, _) = send(
        &app.router,
        request(
            Method::PUT,
            &format!("/v1/bookings/{id}/status"),
            Some(app.provider_id),
            Some(&json!({ "status": "refunded" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn full_refund_settles_payment_and_booking() {
    let app = spawn_app().await;
    let customer = Uuid::new_v4();
    let booking = create_booking(&app, customer, 72).await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let order = create_order(&app, customer, &booking_id).await;
    let payment = capture(&app, order["order_ref"].as_str().unwrap(), "pay_live_1").await;
    let payment_id = payment["id"].as_str().unwrap().to_string();

    let (status, outcome) = send(
        &app.router,
        request(
            Method::POST,
            &format!("/v1/payments/{payment_id}/refund"),
            Some(customer),
            Some(&json!({ "reason": "service not delivered" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "refund failed: {outcome}");
    assert_eq!(outcome["amount"], "300.00");
    assert_eq!(outcome["full"], json!(true));
    assert!(outcome["refund_ref"].as_str().unwrap().starts_with("rfnd_"));

    let (_, fetched) = send(
        &app.router,
        request(
            Method::GET,
            &format!("/v1/bookings/{booking_id}"),
            Some(customer),
            None,
        ),
    )
    .await;
    assert_eq!(fetched["status"], "refunded");
    assert_eq!(fetched["payment_status"], "refunded");

    // The refunded payment cannot be refunded again.
    let (status, _) = send(
        &app.router,
        request(
            Method::POST,
            &format!("/v1/payments/{payment_id}/refund"),
            Some(customer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn failed_payment_allows_another_checkout() {
    let app = spawn_app().await;
    let customer = Uuid::new_v4();
    let booking = create_booking(&app, customer, 72).await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let order = create_order(&app, customer, &booking_id).await;
    let (status, failed) = send(
        &app.router,
        request(
            Method::POST,
            "/v1/payments/failure",
            None,
            Some(&json!({
                "order_ref": order["order_ref"],
                "error_code": "CARD_DECLINED",
                "error_description": "Card declined by issuer",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(failed["status"], "failed");

    let (_, fetched) = send(
        &app.router,
        request(
            Method::GET,
            &format!("/v1/bookings/{booking_id}"),
            Some(customer),
            None,
        ),
    )
    .await;
    assert_eq!(fetched["status"], "payment_failed");

    // A fresh order reopens the booking for payment.
    let retry = create_order(&app, customer, &booking_id).await;
    assert_ne!(retry["order_ref"], order["order_ref"]);

    let (_, fetched) = send(
        &app.router,
        request(
            Method::GET,
            &format!("/v1/bookings/{booking_id}"),
            Some(customer),
            None,
        ),
    )
    .await;
    assert_eq!(fetched["status"], "pending_payment");
}

#[tokio::test]
async fn webhook_capture_is_verified_and_idempotent() {
    let app = spawn_app().await;
    let customer = Uuid::new_v4();
    let booking = create_booking(&app, customer, 72).await;
    let order = create_order(&app, customer, booking["id"].as_str().unwrap()).await;

    let event = json!({
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": "pay_webhook_1",
                    "order_id": order["order_ref"],
                    "method": "upi",
                }
            }
        }
    });
    let body = serde_json::to_vec(&event).unwrap();
    let sig = signature::sign(WEBHOOK_SECRET, &body);

    let deliver = |payload: Vec<u8>, sig: String| {
        let router = app.router.clone();
        async move {
            let request = Request::builder()
                .method(Method::POST)
                .uri("/v1/webhooks/gateway")
                .header(header::CONTENT_TYPE, "application/json")
                .header("X-Gateway-Signature", sig)
                .body(Body::from(payload))
                .unwrap();
            let response = router.oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            (status, body)
        }
    };

    let (status, ack) = deliver(body.clone(), sig.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "applied");

    // Redelivery settles as a no-op, still acknowledged.
    let (status, ack) = deliver(body.clone(), sig.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "already_processed");

    // Tampered body fails the signature and is not acknowledged.
    let mut tampered = event.clone();
    tampered["payload"]["payment"]["entity"]["id"] = json!("pay_webhook_2");
    let (status, _) = deliver(serde_json::to_vec(&tampered).unwrap(), sig.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown events are acknowledged and dropped.
    let unknown = serde_json::to_vec(&json!({ "event": "settlement.processed" })).unwrap();
    let unknown_sig = signature::sign(WEBHOOK_SECRET, &unknown);
    let (status, ack) = deliver(unknown, unknown_sig).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "ignored");

    let (_, fetched) = send(
        &app.router,
        request(
            Method::GET,
            &format!("/v1/bookings/{}", booking["id"].as_str().unwrap()),
            Some(customer),
            None,
        ),
    )
    .await;
    assert_eq!(fetched["status"], "confirmed");
}

#[tokio::test]
async fn webhook_without_signature_is_rejected() {
    let app = spawn_app().await;
    let body = serde_json::to_vec(&json!({ "event": "payment.captured" })).unwrap();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/v1/webhooks/gateway")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customer_list_shows_own_bookings_newest_first() {
    let app = spawn_app().await;
    let customer = Uuid::new_v4();
    let older = create_booking(&app, customer, 48).await;
    let newer = create_booking(&app, customer, 96).await;
    create_booking(&app, Uuid::new_v4(), 200).await;

    let (status, list) = send(
        &app.router,
        request(
            Method::GET,
            "/v1/bookings/customer/my-bookings",
            Some(customer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], newer["id"]);
    assert_eq!(list[1]["id"], older["id"]);

    let (_, filtered) = send(
        &app.router,
        request(
            Method::GET,
            "/v1/bookings/provider/my-bookings?status=pending_payment",
            Some(app.provider_id),
            None,
        ),
    )
    .await;
    assert_eq!(filtered.as_array().unwrap().len(), 3);
}
