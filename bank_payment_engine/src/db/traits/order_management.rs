use crate::{
    db::traits::OrderQueryFilter,
    db_types::{Order, OrderId, SettlementRecord},
};

/// The `OrderManagement` trait defines the behaviour for querying information about orders in the database backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    type Error: std::error::Error;

    async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, Self::Error>;

    /// Fetches orders matching every criterion in `query`, oldest first.
    async fn fetch_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, Self::Error>;

    async fn settlements_for_order(&self, order_id: &OrderId) -> Result<Vec<SettlementRecord>, Self::Error>;
}
