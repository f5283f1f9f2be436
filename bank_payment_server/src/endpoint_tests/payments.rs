use actix_web::{http::StatusCode, test::TestRequest};
use bank_payment_engine::db_types::PaymentStatus;
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path, query_param},
    Mock,
    MockServer,
    ResponseTemplate,
};

use super::helpers::{bearer, call, webhook_body, TestSystem};
use crate::auth::Role;

#[actix_web::test]
async fn qr_requires_a_token() {
    let system = TestSystem::new(None).await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, Some("alice")).await;
    let app = system.app().await;
    let (status, body) = call(&app, TestRequest::get().uri("/api/payments/qr/ORD-20240601-1A2B3C4D")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token was provided."), "was: {body}");

    let req = TestRequest::get()
        .uri("/api/payments/qr/ORD-20240601-1A2B3C4D")
        .insert_header(("Authorization", "Bearer not.a.jwt"));
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn qr_for_own_order() {
    let system = TestSystem::new(None).await;
    system.create_order("ORD-20240601-1a2b3c4d", 250_000, Some("alice")).await;
    let app = system.app().await;
    let req = TestRequest::get()
        .uri("/api/payments/qr/ORD-20240601-1a2b3c4d")
        .insert_header(bearer("alice", vec![Role::User]));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let request: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(request["reference"], "DH1A2B3C4D");
    assert_eq!(request["narration"], "SEVQR DH1A2B3C4D");
    assert_eq!(request["amount"], 250_000);
    assert_eq!(request["payee"]["bank_id"], "MB");
    let url = request["image_url"].as_str().unwrap();
    assert!(url.starts_with("https://img.vietqr.io/image/MB-0123499999-compact2.png?amount=250000"), "{url}");
    assert!(url.contains("addInfo=SEVQR+DH1A2B3C4D"), "{url}");
}

#[actix_web::test]
async fn qr_access_rules() {
    let system = TestSystem::new(None).await;
    system.create_order("ORD-BOB-00000001", 100_000, Some("bob")).await;
    let app = system.app().await;

    let req = TestRequest::get().uri("/api/payments/qr/ORD-BOB-00000001").insert_header(bearer("alice", vec![Role::User]));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let req = TestRequest::get().uri("/api/payments/qr/ORD-BOB-00000001").insert_header(bearer("ops", vec![Role::Admin]));
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::get().uri("/api/payments/qr/NO-SUCH-ORDER").insert_header(bearer("ops", vec![Role::Admin]));
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn qr_for_paid_order_is_a_conflict() {
    let system = TestSystem::new(None).await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, Some("alice")).await;
    let app = system.app().await;
    let hook = webhook_body(1, "DH1A2B3C4D", 250_000, "in", "FT-1");
    call(&app, TestRequest::post().uri("/sepay/webhook").set_json(hook)).await;

    let req = TestRequest::get()
        .uri("/api/payments/qr/ORD-20240601-1A2B3C4D")
        .insert_header(bearer("alice", vec![Role::User]));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[actix_web::test]
async fn payment_status_lists_settlements() {
    let system = TestSystem::new(None).await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, Some("alice")).await;
    let app = system.app().await;
    let hook = webhook_body(1, "SEVQR DH1A2B3C4D", 249_500, "in", "FT-1");
    call(&app, TestRequest::post().uri("/sepay/webhook").set_json(hook)).await;

    let req = TestRequest::get()
        .uri("/api/payments/status/ORD-20240601-1A2B3C4D")
        .insert_header(bearer("alice", vec![Role::User]));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let status: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status["order"]["payment_status"], "PAID");
    assert_eq!(status["settlements"][0]["transaction_code"], "FT-1");
    assert_eq!(status["settlements"][0]["amount"], 249_500);

    let req = TestRequest::get()
        .uri("/api/payments/status/ORD-20240601-1A2B3C4D")
        .insert_header(bearer("mallory", vec![Role::User]));
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn sync_is_admin_only() {
    let system = TestSystem::new(None).await;
    let app = system.app().await;
    let req = TestRequest::post().uri("/api/payments/sync").insert_header(bearer("alice", vec![Role::User]));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("The admin role is required."), "was: {body}");
}

#[actix_web::test]
async fn sync_settles_missed_transfers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions/list"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "messages": { "success": true },
            "transactions": [
                {
                    "id": "1001",
                    "account_number": "0123499999",
                    "transaction_date": "2024-06-01 10:15:00",
                    "amount_out": "0.00",
                    "amount_in": "250000.00",
                    "transaction_content": "SEVQR DH1A2B3C4D",
                    "reference_number": "FT-1001",
                    "code": null
                },
                {
                    "id": "1002",
                    "account_number": "0123499999",
                    "transaction_date": "2024-06-01 10:16:00",
                    "amount_out": "50000.00",
                    "amount_in": "0.00",
                    "transaction_content": "fee",
                    "reference_number": "FT-1002",
                    "code": null
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let system = TestSystem::new(Some(server.uri())).await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, Some("alice")).await;
    let app = system.app().await;

    let req = TestRequest::post().uri("/api/payments/sync?limit=5").insert_header(bearer("ops", vec![Role::Admin]));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let report: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(report["fetched"], 2);
    assert_eq!(report["processed"], 2);
    assert_eq!(report["settled"], json!(["ORD-20240601-1A2B3C4D"]));
    assert_eq!(report["ignored"], 1);
    assert_eq!(report["errors"], json!([]));
    assert_eq!(system.order("ORD-20240601-1A2B3C4D").await.payment_status, PaymentStatus::Paid);
}

#[actix_web::test]
async fn sync_reports_gateway_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions/list"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;
    let system = TestSystem::new(Some(server.uri())).await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, None).await;
    let app = system.app().await;

    let req = TestRequest::post().uri("/api/payments/sync").insert_header(bearer("ops", vec![Role::Admin]));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY, "{body}");
    assert_eq!(system.order("ORD-20240601-1A2B3C4D").await.payment_status, PaymentStatus::Unpaid);
}
