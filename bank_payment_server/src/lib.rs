//! # Bank payment gateway server
//! This crate hosts the HTTP server for the bank payment gateway. It is responsible for:
//! * Receiving transfer notifications from SePay and handing them to the settlement engine.
//! * Triggering a sync against the SePay transaction list, on demand and periodically.
//! * Handing out QR payment requests for unpaid orders.
//! * Streaming "order paid" notifications to connected clients over server-sent events.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/sepay/webhook`: The SePay webhook. Protected by the shared API key, if one is configured.
//! * `/api/payments/sync`: Admin only. Pulls recent transactions from SePay and settles them.
//! * `/api/payments/qr/{order_id}`: The payment request for an order.
//! * `/api/payments/status/{order_id}`: The payment status of an order, with its settlement records.
//! * `/api/notifications/stream`: The notification stream.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod sse;
pub mod sync_worker;

#[cfg(test)]
mod endpoint_tests;
