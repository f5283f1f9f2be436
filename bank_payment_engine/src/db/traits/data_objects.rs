use crate::db_types::{Amount, Order, OrderId, PaymentStatus, SettlementRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOrderResult {
    Inserted(Order),
    AlreadyExists(i64),
}

/// The result of the atomic settlement write. Only `Settled` means that anything was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOrderResult {
    Settled { order: Order, settlement: SettlementRecord },
    /// The order was no longer unpaid when the write was attempted.
    OrderNotUnpaid,
    /// A settlement with the same transaction code was committed first.
    DuplicateTransaction,
}

/// Criteria for order searches. Every criterion that is set must match.
#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub order_id_suffix: Option<String>,
    pub user_id: Option<String>,
    pub total_amount: Option<Amount>,
    pub statuses: Vec<PaymentStatus>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// Matches orders whose id ends with `suffix`, ignoring case.
    pub fn with_order_id_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.order_id_suffix = Some(suffix.into());
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_total_amount(mut self, amount: Amount) -> Self {
        self.total_amount = Some(amount);
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() &&
            self.order_id_suffix.is_none() &&
            self.user_id.is_none() &&
            self.total_amount.is_none() &&
            self.statuses.is_empty()
    }
}
