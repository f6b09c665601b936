//! The append-only audit trail. This module only ever INSERTs and SELECTs; tracking rows are
//! never mutated or deleted.

use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Actor, OrderTracking},
};

/// Appends one audit row for a status transition. Callers invoke this inside the same transaction
/// as the status update itself, so a transition and its audit record commit or roll back together.
pub(crate) async fn append(
    master_order_id: i64,
    sub_order_id: Option<i64>,
    delivery_batch_id: Option<i64>,
    status: &str,
    actor: Actor,
    message: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO order_tracking
            (master_order_id, sub_order_id, delivery_batch_id, status, actor_id, actor_role, message)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(master_order_id)
    .bind(sub_order_id)
    .bind(delivery_batch_id)
    .bind(status)
    .bind(actor.id)
    .bind(actor.role.to_string())
    .bind(message)
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// The full trail for a master order, oldest entry first.
pub async fn trail_for_order(
    master_order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderTracking>, SqliteDatabaseError> {
    let trail = sqlx::query_as::<_, OrderTracking>(
        r#"
        SELECT id, master_order_id, sub_order_id, delivery_batch_id, status, actor_id, actor_role,
               message, created_at
        FROM order_tracking WHERE master_order_id = ? ORDER BY id ASC
        "#,
    )
    .bind(master_order_id)
    .fetch_all(conn)
    .await?;
    Ok(trail)
}
