use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{Amount, Order, OrderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferDirection {
    In,
    Out,
}

/// A bank transfer as reported by the gateway, either pushed through the webhook or pulled by a sync.
///
/// Transfers are never stored as such. A transfer that settles an order leaves a settlement record behind, keyed by
/// `reference_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingTransfer {
    pub gateway_transaction_id: String,
    pub direction: TransferDirection,
    pub amount: Amount,
    /// The free-text transfer content. This is where the payment reference is expected.
    pub narration: String,
    /// The gateway's deduplication key for the transfer.
    pub reference_code: String,
}

impl IncomingTransfer {
    pub fn incoming<S: Into<String>>(gateway_transaction_id: S, amount: Amount, narration: S, reference_code: S) -> Self {
        Self {
            gateway_transaction_id: gateway_transaction_id.into(),
            direction: TransferDirection::In,
            amount,
            narration: narration.into(),
            reference_code: reference_code.into(),
        }
    }

    pub fn with_direction(mut self, direction: TransferDirection) -> Self {
        self.direction = direction;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchMethod {
    /// The payment reference was found in the narration
    Reference,
    /// The transfer amount matched exactly one unpaid order
    Amount,
}

/// Why a transfer did not settle an order. None of these are failures: the transfer was looked at and deliberately
/// left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IgnoreReason {
    NotIncoming,
    AlreadyProcessed,
    NoCandidate,
    AmountMismatch { expected: Amount, received: Amount },
    OrderAlreadyPaid,
}

impl Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::NotIncoming => write!(f, "not an incoming transfer"),
            IgnoreReason::AlreadyProcessed => write!(f, "already processed"),
            IgnoreReason::NoCandidate => write!(f, "no candidate"),
            IgnoreReason::AmountMismatch { expected, received } => {
                write!(f, "amount mismatch: expected {expected}, received {received}")
            },
            IgnoreReason::OrderAlreadyPaid => write!(f, "order already paid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementOutcome {
    Matched { order: Order, matched_by: MatchMethod },
    Ignored(IgnoreReason),
    /// More than one unpaid order fits the transfer. Nothing was settled.
    Ambiguous { candidates: Vec<OrderId> },
}

impl SettlementOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, SettlementOutcome::Matched { .. })
    }
}

impl Display for SettlementOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementOutcome::Matched { order, matched_by } => {
                let by = match matched_by {
                    MatchMethod::Reference => "payment reference",
                    MatchMethod::Amount => "amount",
                };
                write!(f, "Order {} paid (matched by {by})", order.order_id)
            },
            SettlementOutcome::Ignored(reason) => write!(f, "Ignored: {reason}"),
            SettlementOutcome::Ambiguous { candidates } => {
                let ids = candidates.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ");
                write!(f, "Ambiguous: {} candidate orders ({ids})", candidates.len())
            },
        }
    }
}
