use std::{fmt::Display, str::FromStr};

pub use bpg_common::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ConversionError("Order ids cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// The order is waiting for a transfer. Only unpaid orders are settlement candidates.
    Unpaid,
    /// A matching transfer has been recorded against the order.
    Paid,
    /// The payment was returned to the customer by an operator.
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "UNPAID"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNPAID" => Ok(Self::Unpaid),
            "PAID" => Ok(Self::Paid),
            "REFUNDED" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    /// Bank transfer, reported through SePay
    Sepay,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cod => write!(f, "COD"),
            PaymentMethod::Sepay => write!(f, "SEPAY"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "COD" => Ok(Self::Cod),
            "SEPAY" => Ok(Self::Sepay),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    /// The user that placed the order. Guest checkouts have no owner.
    pub user_id: Option<String>,
    pub total_amount: Amount,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_unpaid(&self) -> bool {
        self.payment_status == PaymentStatus::Unpaid
    }

    /// Admins may see every order. Other users only see the orders they own.
    pub fn is_visible_to(&self, user_id: &str, is_admin: bool) -> bool {
        is_admin || self.user_id.as_deref() == Some(user_id)
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub user_id: Option<String>,
    pub total_amount: Amount,
    pub payment_method: PaymentMethod,
}

impl NewOrder {
    pub fn new(order_id: OrderId, total_amount: Amount) -> Self {
        Self { order_id, user_id: None, total_amount, payment_method: PaymentMethod::Sepay }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }
}

//--------------------------------------   SettlementStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SettlementStatus {
    Pending,
    Success,
    Failed,
}

impl Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementStatus::Pending => write!(f, "PENDING"),
            SettlementStatus::Success => write!(f, "SUCCESS"),
            SettlementStatus::Failed => write!(f, "FAILED"),
        }
    }
}

//--------------------------------------   SettlementRecord    ---------------------------------------------------------
/// The ledger entry written when a bank transfer settles an order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,
    /// The gateway's reference code for the transfer. Unique across all settlements.
    pub transaction_code: String,
    pub amount: Amount,
    pub status: SettlementStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSettlement {
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,
    pub transaction_code: String,
    pub amount: Amount,
    pub status: SettlementStatus,
    pub description: String,
}

impl NewSettlement {
    pub fn success(order_id: OrderId, transaction_code: String, amount: Amount) -> Self {
        Self {
            order_id,
            payment_method: PaymentMethod::Sepay,
            transaction_code,
            amount,
            status: SettlementStatus::Success,
            description: String::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
