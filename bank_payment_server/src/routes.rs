//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. I/O, database operations,
//! etc.) must be expressed as futures or asynchronous functions.
use actix_web::{get, http::header, web, HttpRequest, HttpResponse, Responder};
use bank_payment_engine::{
    db_types::OrderId,
    notifications::{BroadcastRegistry, ClientScope},
    settlement_objects::SettlementOutcome,
    OrderApi,
    OrderManagement,
    PaymentGatewayDatabase,
    QrCodeApi,
    SettlementApi,
    SyncApi,
};
use log::*;
use sepay_tools::SepayWebhookPayload;

use crate::{
    auth::{JwtClaims, Role},
    config::{ServerOptions, MAX_SYNC_LIMIT},
    data_objects::{JsonResponse, SyncParams},
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::sepay::{transfer_from_webhook, SepaySource},
    sse::open_notification_stream,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   SePay webhook  ----------------------------------------------------
route!(sepay_webhook => Post "/webhook" impl PaymentGatewayDatabase);
/// Route handler for the SePay webhook.
///
/// SePay calls this endpoint once for every transfer on the watched account. The API key check happens in the
/// middleware wrapping the `/sepay` scope.
///
/// The response is always `200 OK` with a [`JsonResponse`] body, even when the transfer could not be used. SePay
/// retries calls that fail, and a retry would not change the outcome. The `success` flag is false only if the payload
/// could not be read or the engine failed.
pub async fn sepay_webhook<B: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    options: web::Data<ServerOptions>,
    api: web::Data<SettlementApi<B>>,
) -> HttpResponse {
    let peer_ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    let peer = peer_ip.map(|ip| ip.to_string()).unwrap_or_else(|| "an unknown address".to_string());
    trace!("💻️ Received SePay webhook call from {peer}");
    let payload = match serde_json::from_slice::<SepayWebhookPayload>(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!("💻️ Could not read SePay webhook payload from {peer}. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure(format!("Invalid payload. {e}")));
        },
    };
    info!("💻️ SePay reported transaction {} ({} {}) from {peer}", payload.id, payload.transfer_type, payload.transfer_amount);
    let transfer = match transfer_from_webhook(payload) {
        Ok(t) => t,
        Err(e) => {
            warn!("💻️ Could not convert SePay webhook payload. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure(e));
        },
    };
    let response = match api.settle(transfer).await {
        Ok(outcome @ SettlementOutcome::Matched { .. }) => JsonResponse::success(outcome),
        Ok(outcome) => {
            debug!("💻️ Webhook transfer was not applied. {outcome}");
            JsonResponse::success(outcome)
        },
        Err(e) => {
            error!("💻️ Could not settle webhook transfer. {e}");
            JsonResponse::failure(e)
        },
    };
    HttpResponse::Ok().json(response)
}

//----------------------------------------------   Sync  ----------------------------------------------------
route!(sync_payments => Post "/payments/sync" impl PaymentGatewayDatabase where requires [Role::Admin]);
/// Route handler for a manual sync against the SePay transaction list.
///
/// Admins can call `POST /api/payments/sync?limit=N` to fetch the `N` most recent transactions and run each of them
/// through settlement. `limit` defaults to `BPG_SYNC_LIMIT` and is capped at 100.
///
/// Returns the [`SyncReport`](bank_payment_engine::SyncReport). If SePay cannot be reached, nothing is settled and the
/// response is `502 Bad Gateway`.
pub async fn sync_payments<B: PaymentGatewayDatabase>(
    claims: JwtClaims,
    query: web::Query<SyncParams>,
    options: web::Data<ServerOptions>,
    api: web::Data<SyncApi<B, SepaySource>>,
) -> Result<HttpResponse, ServerError> {
    let limit = query.limit.unwrap_or(options.sync_limit).clamp(1, MAX_SYNC_LIMIT);
    info!("💻️ {} requested a sync of the {limit} most recent SePay transactions", claims.sub);
    let report = api.sync_recent(limit).await?;
    info!(
        "💻️ Sync complete. {} fetched, {} settled, {} ignored, {} ambiguous, {} errors",
        report.fetched,
        report.settled.len(),
        report.ignored,
        report.ambiguous,
        report.errors.len()
    );
    Ok(HttpResponse::Ok().json(report))
}

//----------------------------------------------   Payment requests  ----------------------------------------------------
route!(payment_qr => Get "/payments/qr/{order_id}" impl OrderManagement where requires [Role::User]);
/// Route handler for the payment request (QR code) of an order.
///
/// Users can only request payment for their own orders. Admins can request payment for any order.
///
/// Returns `404` if the order does not exist, `403` if it belongs to someone else and `409` if it is no longer
/// awaiting payment.
pub async fn payment_qr<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    orders: web::Data<OrderApi<B>>,
    api: web::Data<QrCodeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ {} requested a payment QR code for order {order_id}", claims.sub);
    check_order_access(&claims, &order_id, &orders).await?;
    let request = api.build_payment_request(&order_id).await.map_err(|e| {
        debug!("💻️ Could not build payment request. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(request))
}

route!(payment_status => Get "/payments/status/{order_id}" impl OrderManagement where requires [Role::User]);
/// Route handler for the payment status of an order, with its settlement records.
///
/// Clients that cannot keep a notification stream open can poll this instead.
pub async fn payment_status<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ {} requested the payment status of order {order_id}", claims.sub);
    let status = api.payment_status(&order_id).await?;
    if !status.order.is_visible_to(&claims.sub, claims.is_admin()) {
        return Err(not_your_order(&claims, &order_id));
    }
    Ok(HttpResponse::Ok().json(status))
}

async fn check_order_access<B: OrderManagement>(
    claims: &JwtClaims,
    order_id: &OrderId,
    api: &OrderApi<B>,
) -> Result<(), ServerError> {
    let order =
        api.fetch_order(order_id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    if order.is_visible_to(&claims.sub, claims.is_admin()) {
        Ok(())
    } else {
        Err(not_your_order(claims, order_id))
    }
}

fn not_your_order(claims: &JwtClaims, order_id: &OrderId) -> ServerError {
    debug!("💻️ {} tried to access order {order_id}, which belongs to someone else", claims.sub);
    ServerError::InsufficientPermissions(format!("Order {order_id} belongs to another user"))
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(notification_stream => Get "/notifications/stream" requires [Role::User]);
/// Route handler for the notification stream.
///
/// Opens a server-sent event stream for the caller. Admins receive every `ORDER_PAID` notification, other users only
/// those for their own orders. Browsers pass the access token in the `token` query parameter.
pub async fn notification_stream(
    claims: JwtClaims,
    registry: web::Data<BroadcastRegistry>,
    options: web::Data<ServerOptions>,
) -> HttpResponse {
    let scope = if claims.is_admin() { ClientScope::Admin } else { ClientScope::User(claims.sub.clone()) };
    let (connection_id, stream) = open_notification_stream(&registry, scope, options.sse_keep_alive);
    debug!("💻️ Notification stream {connection_id} opened for {}", claims.sub);
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(stream)
}
