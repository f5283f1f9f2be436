use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bank_payment_engine::{
    events::EventProducers,
    notifications::BroadcastRegistry,
    OrderApi,
    QrCodeApi,
    QrCodeConfig,
    SettlementApi,
    SettlementConfig,
    SqliteDatabase,
    SyncApi,
};
use bpg_common::Secret;
use log::*;
use sepay_tools::SepayApi;

use crate::{
    auth::TokenValidator,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{notifications::create_notification_event_handlers, sepay::SepaySource},
    middleware::ApiKeyMiddlewareFactory,
    routes::{health, NotificationStreamRoute, PaymentQrRoute, PaymentStatusRoute, SepayWebhookRoute, SyncPaymentsRoute},
    sync_worker::start_sync_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🗃️ Database is ready at {}", config.database_url);
    let registry = BroadcastRegistry::new();
    let handlers = create_notification_event_handlers(registry.clone(), config.event_buffer_size);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let sepay = SepayApi::new(config.sepay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if let Some(interval) = config.sync_interval {
        let settlement = SettlementApi::new(db.clone(), config.settlement_config()?, producers.clone());
        let _handle = start_sync_worker(SyncApi::new(settlement, SepaySource::new(sepay.clone())), interval, config.sync_limit);
    } else {
        info!("🕰️ Periodic SePay sync is disabled. Set BPG_SYNC_INTERVAL_SECS to enable it.");
    }
    let srv = create_server_instance(config, db, registry, producers, sepay)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Everything a worker needs to build its copy of the app.
#[derive(Clone)]
pub struct AppComponents {
    pub db: SqliteDatabase,
    pub registry: BroadcastRegistry,
    pub producers: EventProducers,
    pub sepay: SepayApi,
    pub settlement_config: SettlementConfig,
    pub qr_config: QrCodeConfig,
    pub validator: TokenValidator,
    pub options: ServerOptions,
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    registry: BroadcastRegistry,
    producers: EventProducers,
    sepay: SepayApi,
) -> Result<Server, ServerError> {
    let components = AppComponents {
        db,
        registry,
        producers,
        sepay,
        settlement_config: config.settlement_config()?,
        qr_config: config.qr_code_config()?,
        validator: TokenValidator::new(&config.auth),
        options: ServerOptions::from_config(&config),
    };
    let webhook_api_key = config.webhook_api_key.clone();
    let srv = HttpServer::new(move || {
        let c = components.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bpg::access_log"))
            .configure(|cfg| configure_app(cfg, c, webhook_api_key.clone()))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers the app data and every route. Shared by the server and the endpoint tests.
pub fn configure_app(cfg: &mut web::ServiceConfig, c: AppComponents, webhook_api_key: Option<Secret<String>>) {
    let settlement_api = SettlementApi::new(c.db.clone(), c.settlement_config.clone(), c.producers.clone());
    let sync_api = SyncApi::new(settlement_api.clone(), SepaySource::new(c.sepay.clone()));
    let order_api = OrderApi::new(c.db.clone());
    let qr_api = QrCodeApi::new(c.db.clone(), c.qr_config.clone());
    // Routes that require an access token
    let api_scope = web::scope("/api")
        .service(SyncPaymentsRoute::<SqliteDatabase>::new())
        .service(PaymentQrRoute::<SqliteDatabase>::new())
        .service(PaymentStatusRoute::<SqliteDatabase>::new())
        .service(NotificationStreamRoute::new());
    let sepay_scope = web::scope("/sepay")
        .wrap(ApiKeyMiddlewareFactory::new(webhook_api_key))
        .service(SepayWebhookRoute::<SqliteDatabase>::new());
    cfg.app_data(web::Data::new(settlement_api))
        .app_data(web::Data::new(sync_api))
        .app_data(web::Data::new(order_api))
        .app_data(web::Data::new(qr_api))
        .app_data(web::Data::new(c.registry))
        .app_data(web::Data::new(c.validator))
        .app_data(web::Data::new(c.options))
        .service(health)
        .service(api_scope)
        .service(sepay_scope);
}
