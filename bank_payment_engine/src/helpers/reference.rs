//! # Payment references
//!
//! A payment reference is the string a customer puts in the content of their bank transfer so that the transfer can be
//! traced back to an order. It is the reference prefix followed by the last [`REFERENCE_SUFFIX_LEN`] characters of the
//! order id, upper-cased:
//!
//! ```text
//!    order id  6650f3c2a91b4e7d1a2b3c4d   →   DH1A2B3C4D
//! ```
//!
//! The derivation is pure, so the QR code that asks for the transfer and the parser that reads the transfer back
//! always agree, provided they are configured with the same prefix.
//!
//! References are not unique. Two order ids that share their last 8 characters produce the same reference. When that
//! happens for two unpaid orders, the transfer is reported as ambiguous rather than settled.
//!
//! Order ids shorter than 8 characters use the whole id. Such references never match the parser, which insists on
//! exactly 8 characters, so those orders can only be settled by amount.
use std::fmt::Display;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::OrderId;

pub const DEFAULT_REFERENCE_PREFIX: &str = "DH";
pub const REFERENCE_SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, Error)]
#[error("Invalid payment reference prefix '{0}'. Prefixes must be non-empty and ASCII alphanumeric.")]
pub struct InvalidReferencePrefix(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentReference(String);

impl PaymentReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PaymentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the payment reference for an order. Slicing is done on characters, so multibyte ids are safe.
pub fn derive_reference(prefix: &str, order_id: &OrderId) -> PaymentReference {
    let chars = order_id.as_str().chars().collect::<Vec<char>>();
    let start = chars.len().saturating_sub(REFERENCE_SUFFIX_LEN);
    let suffix = chars[start..].iter().collect::<String>().to_uppercase();
    PaymentReference(format!("{prefix}{suffix}"))
}

/// Derives references and finds them again in transfer narrations.
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    prefix: String,
    pattern: Regex,
}

impl ReferenceMatcher {
    pub fn new(prefix: &str) -> Result<Self, InvalidReferencePrefix> {
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(InvalidReferencePrefix(prefix.to_string()));
        }
        let prefix = prefix.to_uppercase();
        let pattern = Regex::new(&format!("(?i){}([A-Z0-9]{{{REFERENCE_SUFFIX_LEN}}})", regex::escape(&prefix)))
            .map_err(|e| InvalidReferencePrefix(format!("{prefix} ({e})")))?;
        Ok(Self { prefix, pattern })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn derive(&self, order_id: &OrderId) -> PaymentReference {
        derive_reference(&self.prefix, order_id)
    }

    /// Returns the upper-cased order id suffix of the first reference found in `narration`, if any.
    pub fn extract_suffix(&self, narration: &str) -> Option<String> {
        self.pattern.captures(narration).and_then(|c| c.get(1)).map(|m| m.as_str().to_uppercase())
    }
}
