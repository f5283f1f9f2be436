//! Client library for the SePay bank transfer gateway.
//!
//! SePay watches a merchant bank account and reports every transfer on it, either by pushing a webhook
//! ([`SepayWebhookPayload`]) or on request through its REST API ([`SepayApi::fetch_transactions`]).
//! This crate only speaks SePay's wire format. Matching transfers to orders is the job of the payment engine.
mod api;
mod config;
mod data_objects;
mod error;

pub mod helpers;

pub use api::SepayApi;
pub use config::SepayConfig;
pub use data_objects::{SepayTransaction, SepayWebhookPayload, TransactionListResponse, TransferType};
pub use error::SepayApiError;
