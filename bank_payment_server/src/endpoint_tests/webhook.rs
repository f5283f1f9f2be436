use actix_web::{http::StatusCode, test::TestRequest};
use bank_payment_engine::db_types::PaymentStatus;

use super::helpers::{call, webhook_body, TestSystem, WEBHOOK_KEY};
use crate::data_objects::JsonResponse;

fn webhook_request(body: serde_json::Value) -> TestRequest {
    TestRequest::post().uri("/sepay/webhook").set_json(body)
}

fn response(body: &str) -> JsonResponse {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Not a JsonResponse ({e}): {body}"))
}

#[actix_web::test]
async fn webhook_settles_order_by_reference() {
    let system = TestSystem::new(None).await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, Some("alice")).await;
    let app = system.app().await;

    let body = webhook_body(92704, "SEVQR DH1A2B3C4D thanh toan", 250_000, "in", "FT24153000001");
    let (status, body) = call(&app, webhook_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    let res = response(&body);
    assert!(res.success);
    assert_eq!(res.message, "Order #ORD-20240601-1A2B3C4D paid (matched by payment reference)");
    assert_eq!(system.order("ORD-20240601-1A2B3C4D").await.payment_status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn repeated_webhook_is_ignored() {
    let system = TestSystem::new(None).await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, None).await;
    let app = system.app().await;

    let body = webhook_body(92704, "DH1A2B3C4D", 250_000, "in", "FT24153000001");
    let (_, first) = call(&app, webhook_request(body.clone())).await;
    assert!(response(&first).message.contains("paid"));
    let (status, second) = call(&app, webhook_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    let res = response(&second);
    assert!(res.success);
    assert_eq!(res.message, "Ignored: already processed");
}

#[actix_web::test]
async fn outgoing_transfers_are_acknowledged_but_ignored() {
    let system = TestSystem::new(None).await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, None).await;
    let app = system.app().await;

    let body = webhook_body(92705, "DH1A2B3C4D refund", 250_000, "out", "FT24153000002");
    let (status, body) = call(&app, webhook_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response(&body).message, "Ignored: not an incoming transfer");
    assert_eq!(system.order("ORD-20240601-1A2B3C4D").await.payment_status, PaymentStatus::Unpaid);
}

#[actix_web::test]
async fn malformed_payload_still_gets_200() {
    let system = TestSystem::new(None).await;
    let app = system.app().await;
    let req = TestRequest::post().uri("/sepay/webhook").set_payload("{ this is not json");
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let res = response(&body);
    assert!(!res.success);
    assert!(res.message.starts_with("Invalid payload."), "was: {}", res.message);
}

#[actix_web::test]
async fn wrong_api_key_is_rejected() {
    let system = TestSystem::new(None).await.with_webhook_key(WEBHOOK_KEY);
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, None).await;
    let app = system.app().await;
    let body = webhook_body(92704, "DH1A2B3C4D", 250_000, "in", "FT24153000001");

    let req = webhook_request(body.clone()).insert_header(("Authorization", "Apikey not-the-key"));
    let (status, text) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(text.contains("The webhook API key does not match."), "was: {text}");

    let (status, _) = call(&app, webhook_request(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(system.order("ORD-20240601-1A2B3C4D").await.payment_status, PaymentStatus::Unpaid);

    let req = webhook_request(body).insert_header(("Authorization", format!("Apikey {WEBHOOK_KEY}")));
    let (status, text) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response(&text).success);
    assert_eq!(system.order("ORD-20240601-1A2B3C4D").await.payment_status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn amount_fallback_and_mismatch() {
    let system = TestSystem::new(None).await;
    system.create_order("A-0001", 100_000, None).await;
    let app = system.app().await;

    // Reference names an unknown order and no order costs 98 000, so nothing to match
    let body = webhook_body(1, "DHZZZZZZZZ", 98_000, "in", "FT-1");
    let (_, text) = call(&app, webhook_request(body)).await;
    assert_eq!(response(&text).message, "Ignored: no candidate");

    // No reference at all, but the amount matches exactly one unpaid order
    let body = webhook_body(2, "chuyen khoan", 100_000, "in", "FT-2");
    let (_, text) = call(&app, webhook_request(body)).await;
    assert_eq!(response(&text).message, "Order #A-0001 paid (matched by amount)");
}
