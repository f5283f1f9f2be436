use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::{
        sqlite::SqliteDatabaseError,
        traits::{InsertOrderResult, OrderQueryFilter},
    },
    db_types::{NewOrder, Order, OrderId, PaymentStatus},
};

const ORDER_COLUMNS: &str =
    "id, order_id, user_id, total_amount, payment_status, payment_method, created_at, updated_at";

pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, SqliteDatabaseError> {
    let result = match order_exists(&order.order_id, conn).await? {
        Some(id) => InsertOrderResult::AlreadyExists(id),
        None => InsertOrderResult::Inserted(insert_order(order, conn).await?),
    };
    Ok(result)
}

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SqliteDatabaseError> {
    let order_id = order.order_id.clone();
    let result = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO orders (order_id, user_id, total_amount, payment_method) VALUES ($1, $2, $3, $4) RETURNING \
         {ORDER_COLUMNS}"
    ))
    .bind(order.order_id)
    .bind(order.user_id)
    .bind(order.total_amount)
    .bind(order.payment_method)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => {
            debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_id, order.id);
            Ok(order)
        },
        Err(e) if SqliteDatabaseError::is_unique_violation(&e) => {
            Err(SqliteDatabaseError::DuplicateOrder(order_id.as_str().to_string()))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"))
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Checks whether the order with the given `OrderId` already exists in the database. If it does exist, the `id` of the
/// order is returned. If it does not exist, `None` is returned.
pub async fn order_exists(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<i64>, SqliteDatabaseError> {
    fetch_order_by_order_id(order_id, conn).await.map(|o| o.map(|o| o.id))
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn fetch_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.0);
    }
    if let Some(suffix) = query.order_id_suffix {
        where_clause.push("upper(order_id) LIKE '%' || ");
        where_clause.push_bind_unseparated(escape_like(&suffix.to_uppercase()));
        where_clause.push_unseparated(" ESCAPE '\\'");
    }
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(amount) = query.total_amount {
        where_clause.push("total_amount = ");
        where_clause.push_bind_unseparated(amount);
    }
    if !query.statuses.is_empty() {
        let statuses = query.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("payment_status IN ({statuses})"));
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of fetch_orders: {:?}", orders.len());
    Ok(orders)
}

/// Conditionally moves an order from unpaid to paid. Returns `None` if the order does not exist or was not unpaid, in
/// which case nothing was changed.
pub(crate) async fn mark_order_paid(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 AND \
         payment_status = $3 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(PaymentStatus::Paid)
    .bind(order_id.as_str())
    .bind(PaymentStatus::Unpaid)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod test {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("ABCD1234"), "ABCD1234");
        assert_eq!(escape_like("AB%D_234"), "AB\\%D\\_234");
    }
}
