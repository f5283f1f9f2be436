//! Bank Payment Engine
//!
//! The engine turns bank transfers reported by a payment gateway into paid orders. Customers pay by bank transfer,
//! quoting a payment reference derived from their order id. The gateway later reports the transfer, and the engine
//! works out which order, if any, it pays for.
//!
//! The library is divided into these sections:
//! 1. Database management and control ([`mod@db`]). Only SQLite is supported at present. Backends implement the
//!    traits in [`db::traits`]. The data types stored in the database live in [`db_types`].
//! 2. The public API ([`mod@bpe_api`]): settlement, payment request (QR code) generation, gateway syncing and order
//!    queries.
//! 3. Events ([`events`]). Subscribers are told when an order has been paid. Publishing never blocks settlement.
//! 4. The notification registry ([`notifications`]), which fans order-paid notifications out to connected clients.
pub mod db;

mod bpe_api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod notifications;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{InsertOrderResult, OrderManagement, OrderQueryFilter, PaymentGatewayDatabase, SettleOrderResult};
pub use bpe_api::{
    errors::{PaymentGatewayError, QrCodeError},
    order_api::{OrderApi, OrderPaymentStatus},
    qr_api::{PayeeInfo, PaymentRequest, QrCodeApi, QrCodeConfig},
    settlement_api::{SettlementApi, SettlementConfig, DEFAULT_AMOUNT_TOLERANCE},
    settlement_objects,
    sync_api::{IntoIncomingTransfer, SyncApi, SyncItemError, SyncReport, TransactionSource},
};
