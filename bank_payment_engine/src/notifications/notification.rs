use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Amount, OrderId, PaymentStatus},
    events::OrderPaidEvent,
};

/// Who a streaming client is listening as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "lowercase")]
pub enum ClientScope {
    User(String),
    Admin,
}

impl Display for ClientScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientScope::User(id) => write!(f, "user:{id}"),
            ClientScope::Admin => write!(f, "admin"),
        }
    }
}

/// The payloads pushed to streaming clients, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    Connected { connection_id: String },
    Heartbeat { timestamp: DateTime<Utc> },
    OrderPaid { order_id: OrderId, payment_status: PaymentStatus, amount: Amount, transaction_code: String },
}

impl Notification {
    pub fn heartbeat() -> Self {
        Self::Heartbeat { timestamp: Utc::now() }
    }
}

impl From<&OrderPaidEvent> for Notification {
    fn from(event: &OrderPaidEvent) -> Self {
        Self::OrderPaid {
            order_id: event.order.order_id.clone(),
            payment_status: event.order.payment_status,
            amount: event.settlement.amount,
            transaction_code: event.settlement.transaction_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastEvent {
    pub target: ClientScope,
    pub notification: Notification,
}

impl BroadcastEvent {
    pub fn new(target: ClientScope, notification: Notification) -> Self {
        Self { target, notification }
    }

    /// The broadcasts for a paid order: one to the order's owner, if it has one, and one to the admin scope.
    pub fn for_order_paid(event: &OrderPaidEvent) -> Vec<Self> {
        let notification = Notification::from(event);
        let mut result = Vec::with_capacity(2);
        if let Some(user_id) = &event.order.user_id {
            result.push(Self::new(ClientScope::User(user_id.clone()), notification.clone()));
        }
        result.push(Self::new(ClientScope::Admin, notification));
        result
    }
}
