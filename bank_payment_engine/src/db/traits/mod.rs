//! #  Order store contracts.
//!
//! The reconciliation engine never talks to a database directly. It is written against the traits in this module, and
//! a backend (currently only SQLite) implements them.
//!
//! * [`OrderManagement`] provides read access to orders and their settlement records.
//! * [`PaymentGatewayDatabase`] adds the writes the engine needs: creating orders, checking for processed transfers and
//!   the atomic settlement write.
mod data_objects;
mod order_management;
mod payment_gateway_database;

pub use data_objects::{InsertOrderResult, OrderQueryFilter, SettleOrderResult};
pub use order_management::OrderManagement;
pub use payment_gateway_database::PaymentGatewayDatabase;
