use crate::{
    db::traits::{InsertOrderResult, OrderManagement, SettleOrderResult},
    db_types::{NewOrder, NewSettlement, OrderId},
};

/// This trait defines the writes that the reconciliation engine needs from a backend.
///
/// The backend is the single source of truth for payment status. In particular, [`Self::settle_order`] must make
/// double settlement impossible, not merely unlikely: the status change and the settlement record are committed
/// together or not at all.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new unpaid order. Orders are created by checkout, which lives outside this system, so this is mostly
    /// used by tooling and tests.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, Self::Error>;

    /// Returns true if a settlement has been recorded for the given gateway transaction code.
    async fn settlement_exists(&self, transaction_code: &str) -> Result<bool, Self::Error>;

    /// In a single atomic transaction,
    /// * marks the order as paid, but only if it is currently unpaid,
    /// * inserts the settlement record, whose transaction code must be unique.
    ///
    /// If either step is refused, nothing is committed and the reason is returned. Any other failure is an error, and
    /// likewise commits nothing.
    async fn settle_order(&self, order_id: &OrderId, settlement: NewSettlement)
        -> Result<SettleOrderResult, Self::Error>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
