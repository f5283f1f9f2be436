use std::fmt::Debug;

use log::*;
use serde::Serialize;

use crate::{
    bpe_api::{errors::PaymentGatewayError, settlement_api::db_error},
    db::traits::{InsertOrderResult, OrderManagement, PaymentGatewayDatabase},
    db_types::{NewOrder, Order, OrderId, SettlementRecord},
};

/// An order together with the settlements recorded against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPaymentStatus {
    pub order: Order,
    pub settlements: Vec<SettlementRecord>,
}

/// Read access to orders and their payment history.
pub struct OrderApi<B> {
    db: B,
}

impl<B> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

impl<B> OrderApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderApi<B>
where B: OrderManagement
{
    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError> {
        self.db.order_by_id(order_id).await.map_err(db_error)
    }

    pub async fn payment_status(&self, order_id: &OrderId) -> Result<OrderPaymentStatus, PaymentGatewayError> {
        let order = self.fetch_order(order_id).await?.ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
        let settlements = self.db.settlements_for_order(order_id).await.map_err(db_error)?;
        Ok(OrderPaymentStatus { order, settlements })
    }
}

impl<B> OrderApi<B>
where B: PaymentGatewayDatabase
{
    /// Stores a new unpaid order. Submitting an order id that already exists is an error.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        let order_id = order.order_id.clone();
        match self.db.insert_order(order).await.map_err(db_error)? {
            InsertOrderResult::Inserted(order) => {
                debug!("📦️ Order {} created for {}", order.order_id, order.total_amount);
                Ok(order)
            },
            InsertOrderResult::AlreadyExists(id) => {
                Err(PaymentGatewayError::DatabaseError(format!("Order {order_id} already exists with id {id}")))
            },
        }
    }
}
