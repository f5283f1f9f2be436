use std::{pin::Pin, time::Duration};

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    App,
};
use bank_payment_engine::{
    db_types::{Amount, NewOrder, Order, OrderId},
    events::EventProducers,
    notifications::BroadcastRegistry,
    test_utils::prepare_env::fresh_database,
    OrderApi,
    QrCodeConfig,
    SettlementConfig,
    SqliteDatabase,
    DEFAULT_AMOUNT_TOLERANCE,
};
use bpg_common::Secret;
use chrono::{Days, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use sepay_tools::{SepayApi, SepayConfig};

use crate::{
    auth::{JwtClaims, Role, TokenValidator},
    config::{AuthConfig, ServerOptions},
    integrations::notifications::create_notification_event_handlers,
    server::{configure_app, AppComponents},
};

// Test secret for issuing tokens. DO NOT re-use it anywhere.
pub const TEST_JWT_SECRET: &str = "f1a7c0ffee-endpoint-tests-only-5b2d9e";
pub const WEBHOOK_KEY: &str = "sepay-webhook-test-key";

pub fn issue_token(sub: &str, roles: Vec<Role>) -> String {
    let exp = (Utc::now() + Days::new(1)).timestamp() as usize;
    let claims = JwtClaims { sub: sub.to_string(), roles, exp };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()))
        .expect("Failed to sign token")
}

pub fn bearer(sub: &str, roles: Vec<Role>) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", issue_token(sub, roles)))
}

/// A migrated throwaway database plus everything the app is built from.
pub struct TestSystem {
    pub db: SqliteDatabase,
    pub registry: BroadcastRegistry,
    pub components: AppComponents,
    pub webhook_key: Option<Secret<String>>,
}

impl TestSystem {
    /// `sepay_url` points the SePay client at a mock server. Without it, any sync attempt fails to connect.
    pub async fn new(sepay_url: Option<String>) -> Self {
        let db = fresh_database().await;
        let registry = BroadcastRegistry::new();
        let sepay = SepayApi::new(SepayConfig {
            api_url: sepay_url.unwrap_or_else(|| "http://127.0.0.1:9".to_string()),
            api_token: Secret::new("sepay-token".to_string()),
            account_number: "0123499999".to_string(),
            timeout: Duration::from_secs(2),
        })
        .expect("Could not create SePay client");
        let settlement_config = SettlementConfig::new("DH", DEFAULT_AMOUNT_TOLERANCE).expect("valid prefix");
        let qr_config = QrCodeConfig::new("MB", "0123499999", "BPG SHOP", settlement_config.matcher.clone());
        let components = AppComponents {
            db: db.clone(),
            registry: registry.clone(),
            producers: EventProducers::default(),
            sepay,
            settlement_config,
            qr_config,
            validator: TokenValidator::new(&AuthConfig::new(TEST_JWT_SECRET)),
            options: ServerOptions::default(),
        };
        Self { db, registry, components, webhook_key: None }
    }

    pub fn with_webhook_key(mut self, key: &str) -> Self {
        self.webhook_key = Some(Secret::new(key.to_string()));
        self
    }

    /// Routes order-paid events into the registry, the way the server does.
    pub async fn with_notifications(mut self) -> Self {
        let handlers = create_notification_event_handlers(self.registry.clone(), 10);
        self.components.producers = handlers.producers();
        handlers.start_handlers().await;
        self
    }

    pub async fn app(
        &self,
    ) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
        let components = self.components.clone();
        let key = self.webhook_key.clone();
        test::init_service(App::new().configure(move |cfg| configure_app(cfg, components, key))).await
    }

    pub async fn create_order(&self, order_id: &str, amount: i64, user: Option<&str>) -> Order {
        let mut order = NewOrder::new(OrderId::from(order_id), Amount::from(amount));
        if let Some(user) = user {
            order = order.with_user(user);
        }
        OrderApi::new(self.db.clone()).create_order(order).await.expect("Could not create order")
    }

    pub async fn order(&self, order_id: &str) -> Order {
        OrderApi::new(self.db.clone()).fetch_order(&OrderId::from(order_id)).await.unwrap().expect("order exists")
    }
}

pub fn webhook_body(id: u64, content: &str, amount: i64, transfer_type: &str, reference_code: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "gateway": "MBBank",
        "transactionDate": "2024-06-01 10:15:00",
        "accountNumber": "0123499999",
        "code": null,
        "content": content,
        "transferType": transfer_type,
        "transferAmount": amount,
        "accumulated": 50000000,
        "subAccount": null,
        "referenceCode": reference_code,
        "description": ""
    })
}

pub async fn call<S, B>(app: &S, req: TestRequest) -> (StatusCode, String)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = test::call_service(app, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// Reads the next chunk of a streaming body, giving up after a few seconds.
pub async fn next_chunk<B: MessageBody>(body: &mut Pin<Box<B>>) -> Option<String> {
    let chunk = tokio::time::timeout(
        Duration::from_secs(5),
        futures::future::poll_fn(|cx| body.as_mut().poll_next(cx)),
    )
    .await
    .ok()??;
    chunk.ok().map(|b| String::from_utf8_lossy(&b).into_owned())
}
