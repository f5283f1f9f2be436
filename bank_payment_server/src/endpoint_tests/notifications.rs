use actix_web::{
    http::{header, StatusCode},
    test,
    test::TestRequest,
};
use serde_json::Value;

use super::helpers::{call, issue_token, next_chunk, webhook_body, TestSystem};
use crate::auth::Role;

fn parse_frame(frame: &str) -> Value {
    let data = frame
        .strip_prefix("data: ")
        .and_then(|s| s.strip_suffix("\n\n"))
        .unwrap_or_else(|| panic!("Not an SSE data frame: {frame:?}"));
    serde_json::from_str(data).unwrap()
}

#[actix_web::test]
async fn stream_requires_a_token() {
    let system = TestSystem::new(None).await;
    let app = system.app().await;
    let (status, _) = call(&app, TestRequest::get().uri("/api/notifications/stream")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, TestRequest::get().uri("/api/notifications/stream?token=garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(system.registry.is_empty());
}

#[actix_web::test]
async fn stream_lifecycle() {
    let system = TestSystem::new(None).await.with_notifications().await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, Some("alice")).await;
    let app = system.app().await;

    let token = issue_token("alice", vec![Role::User]);
    let req = TestRequest::get().uri(&format!("/api/notifications/stream?token={token}")).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    assert_eq!(content_type, Some("text/event-stream"));
    let mut body = Box::pin(res.into_body());

    let connected = parse_frame(&next_chunk(&mut body).await.expect("connected frame"));
    assert_eq!(connected["type"], "CONNECTED");
    let connection_id = connected["connection_id"].as_str().unwrap().to_string();
    assert!(system.registry.is_registered(&connection_id));
    assert_eq!(system.registry.len(), 1);

    let hook = webhook_body(7, "SEVQR DH1A2B3C4D", 250_000, "in", "FT-7");
    let (status, _) = call(&app, TestRequest::post().uri("/sepay/webhook").set_json(hook)).await;
    assert_eq!(status, StatusCode::OK);

    let paid = parse_frame(&next_chunk(&mut body).await.expect("order paid frame"));
    assert_eq!(paid["type"], "ORDER_PAID");
    assert_eq!(paid["order_id"], "ORD-20240601-1A2B3C4D");
    assert_eq!(paid["payment_status"], "PAID");
    assert_eq!(paid["amount"], 250_000);
    assert_eq!(paid["transaction_code"], "FT-7");

    drop(body);
    assert!(system.registry.is_empty());
}

#[actix_web::test]
async fn other_users_do_not_see_the_payment() {
    let system = TestSystem::new(None).await.with_notifications().await;
    system.create_order("ORD-20240601-1A2B3C4D", 250_000, Some("alice")).await;
    let app = system.app().await;

    let bob = issue_token("bob", vec![Role::User]);
    let res = test::call_service(
        &app,
        TestRequest::get().uri(&format!("/api/notifications/stream?token={bob}")).to_request(),
    )
    .await;
    let mut bob_body = Box::pin(res.into_body());
    let admin = issue_token("ops", vec![Role::Admin]);
    let res = test::call_service(
        &app,
        TestRequest::get().uri(&format!("/api/notifications/stream?token={admin}")).to_request(),
    )
    .await;
    let mut admin_body = Box::pin(res.into_body());
    assert_eq!(parse_frame(&next_chunk(&mut bob_body).await.unwrap())["type"], "CONNECTED");
    assert_eq!(parse_frame(&next_chunk(&mut admin_body).await.unwrap())["type"], "CONNECTED");
    assert_eq!(system.registry.len(), 2);

    let hook = webhook_body(8, "DH1A2B3C4D", 250_000, "in", "FT-8");
    call(&app, TestRequest::post().uri("/sepay/webhook").set_json(hook)).await;

    let paid = parse_frame(&next_chunk(&mut admin_body).await.expect("admin sees every payment"));
    assert_eq!(paid["order_id"], "ORD-20240601-1A2B3C4D");
    let nothing = tokio::time::timeout(std::time::Duration::from_millis(200), next_chunk(&mut bob_body)).await;
    assert!(nothing.is_err(), "bob should not be told about alice's order");
}
