use serde::{Deserialize, Serialize};

use crate::db_types::{Order, SettlementRecord};

/// Emitted after a settlement has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub settlement: SettlementRecord,
}

impl OrderPaidEvent {
    pub fn new(order: Order, settlement: SettlementRecord) -> Self {
        Self { order, settlement }
    }
}
