use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_pool, orders, settlements, SqliteDatabaseError};
use crate::{
    db::traits::{InsertOrderResult, OrderManagement, OrderQueryFilter, PaymentGatewayDatabase, SettleOrderResult},
    db_types::{NewOrder, NewSettlement, Order, OrderId, SettlementRecord},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `BPG_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_order_id(order_id, &mut conn).await
    }

    async fn fetch_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(query, &mut conn).await
    }

    async fn settlements_for_order(&self, order_id: &OrderId) -> Result<Vec<SettlementRecord>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        settlements::fetch_settlements_for_order(order_id, &mut conn).await
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn settlement_exists(&self, transaction_code: &str) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        settlements::settlement_exists(transaction_code, &mut conn).await
    }

    async fn settle_order(
        &self,
        order_id: &OrderId,
        settlement: NewSettlement,
    ) -> Result<SettleOrderResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::mark_order_paid(order_id, &mut tx).await? else {
            debug!("🗃️ Order {order_id} is not unpaid. Settlement rolled back.");
            tx.rollback().await?;
            return Ok(SettleOrderResult::OrderNotUnpaid);
        };
        let settlement = match settlements::insert_settlement(settlement, &mut tx).await {
            Ok(record) => record,
            Err(SqliteDatabaseError::DuplicateTransaction(code)) => {
                debug!("🗃️ Transaction {code} has already been settled. Settlement of {order_id} rolled back.");
                tx.rollback().await?;
                return Ok(SettleOrderResult::DuplicateTransaction);
            },
            Err(e) => {
                warn!("🗃️ Could not record settlement for {order_id}. Rolling back. {e}");
                if let Err(rb) = tx.rollback().await {
                    error!("🗃️ Rollback of the settlement for {order_id} failed: {rb}");
                }
                return Err(e);
            },
        };
        tx.commit().await?;
        debug!("🗃️ Order {order_id} marked as paid by transaction {}", settlement.transaction_code);
        Ok(SettleOrderResult::Settled { order, settlement })
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}
