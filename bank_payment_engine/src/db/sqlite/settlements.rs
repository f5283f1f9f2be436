use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewSettlement, OrderId, SettlementRecord},
};

const SETTLEMENT_COLUMNS: &str =
    "id, order_id, payment_method, transaction_code, amount, status, description, created_at";

/// Inserts a settlement record. A second record with the same transaction code is rejected by the unique index and
/// reported as [`SqliteDatabaseError::DuplicateTransaction`].
pub async fn insert_settlement(
    settlement: NewSettlement,
    conn: &mut SqliteConnection,
) -> Result<SettlementRecord, SqliteDatabaseError> {
    let code = settlement.transaction_code.clone();
    let result = sqlx::query_as::<_, SettlementRecord>(&format!(
        "INSERT INTO settlements (order_id, payment_method, transaction_code, amount, status, description) VALUES \
         ($1, $2, $3, $4, $5, $6) RETURNING {SETTLEMENT_COLUMNS}"
    ))
    .bind(settlement.order_id.as_str())
    .bind(settlement.payment_method)
    .bind(settlement.transaction_code)
    .bind(settlement.amount)
    .bind(settlement.status)
    .bind(settlement.description)
    .fetch_one(conn)
    .await;
    match result {
        Ok(record) => {
            debug!("🗃️ Settlement #{} recorded for transaction {code}", record.id);
            Ok(record)
        },
        Err(e) if SqliteDatabaseError::is_unique_violation(&e) => Err(SqliteDatabaseError::DuplicateTransaction(code)),
        Err(e) => Err(e.into()),
    }
}

pub async fn settlement_exists(transaction_code: &str, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settlements WHERE transaction_code = $1")
        .bind(transaction_code)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn fetch_settlements_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<SettlementRecord>, SqliteDatabaseError> {
    let records = sqlx::query_as::<_, SettlementRecord>(&format!(
        "SELECT {SETTLEMENT_COLUMNS} FROM settlements WHERE order_id = $1 ORDER BY id ASC"
    ))
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(records)
}
