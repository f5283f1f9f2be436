//! # Bank payment engine public API
//!
//! * [`settlement_api`] matches incoming bank transfers to unpaid orders and records the payments.
//! * [`qr_api`] builds the payment requests customers scan to pay for an order.
//! * [`sync_api`] pulls recent transactions from the gateway and feeds them to settlement.
//! * [`order_api`] gives read access to orders and their settlements.
//!
//! Every API is created from a database backend that implements the traits it needs, e.g.
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url(url, 5).await?;
//! let api = OrderApi::new(db);
//! let status = api.payment_status(&order_id).await?;
//! ```
pub mod errors;
pub mod order_api;
pub mod qr_api;
pub mod settlement_api;
pub mod settlement_objects;
pub mod sync_api;
