use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{DeliveryBatch, DeliveryBatchStatus, SubOrder},
};

const BATCH_COLUMNS: &str = r#"
    id, master_order_id, courier_id, address_id, status, otp_code, otp_sent_at,
    estimated_delivery_at, delivered_at, created_at, updated_at
"#;

pub async fn insert_batch(
    master_order_id: i64,
    address_id: i64,
    courier_id: Option<i64>,
    otp_code: &str,
    estimated_delivery_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO delivery_batches
            (master_order_id, address_id, courier_id, otp_code, estimated_delivery_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(master_order_id)
    .bind(address_id)
    .bind(courier_id)
    .bind(otp_code)
    .bind(estimated_delivery_at)
    .execute(conn)
    .await?;
    let id = result.last_insert_rowid();
    debug!("🗃️ Delivery batch #{id} created for order #{master_order_id} (courier: {courier_id:?})");
    Ok(id)
}

pub async fn fetch_batch(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryBatch>, SqliteDatabaseError> {
    let batch = sqlx::query_as::<_, DeliveryBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM delivery_batches WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(batch)
}

pub async fn batches_for_order(
    master_order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<DeliveryBatch>, SqliteDatabaseError> {
    let batches = sqlx::query_as::<_, DeliveryBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM delivery_batches WHERE master_order_id = ? ORDER BY id ASC"
    ))
    .bind(master_order_id)
    .fetch_all(conn)
    .await?;
    Ok(batches)
}

pub async fn members(
    batch_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<SubOrder>, SqliteDatabaseError> {
    let subs = sqlx::query_as::<_, SubOrder>(
        r#"
        SELECT id, master_order_id, seller_id, store_id, subtotal, delivery_charge, total,
               self_delivery, status, delivery_batch_id, created_at, updated_at
        FROM sub_orders WHERE delivery_batch_id = ? ORDER BY id ASC
        "#,
    )
    .bind(batch_id)
    .fetch_all(conn)
    .await?;
    Ok(subs)
}

pub async fn open_batches_for_courier(
    courier_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<DeliveryBatch>, SqliteDatabaseError> {
    let batches = sqlx::query_as::<_, DeliveryBatch>(&format!(
        r#"
        SELECT {BATCH_COLUMNS} FROM delivery_batches
        WHERE courier_id = ? AND status NOT IN ('Delivered', 'Cancelled')
        ORDER BY created_at ASC
        "#
    ))
    .bind(courier_id)
    .fetch_all(conn)
    .await?;
    Ok(batches)
}

/// Claims a pending batch for the courier. A batch pre-assigned at placement time can only be
/// confirmed by that courier; an unassigned batch goes to whoever claims it first. The guard
/// predicates make concurrent accepts race-safe: only one courier's UPDATE affects the row.
pub(crate) async fn try_accept(
    batch_id: i64,
    courier_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE delivery_batches
        SET courier_id = ?, status = 'Accepted', updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND status = 'Pending' AND (courier_id IS NULL OR courier_id = ?)
        "#,
    )
    .bind(courier_id)
    .bind(batch_id)
    .bind(courier_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub(crate) async fn update_status(
    batch_id: i64,
    status: DeliveryBatchStatus,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let status = status.to_string();
    sqlx::query(
        "UPDATE delivery_batches SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(status)
    .bind(batch_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn set_otp(
    batch_id: i64,
    code: &str,
    sent_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
        UPDATE delivery_batches
        SET otp_code = ?, otp_sent_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(code)
    .bind(sent_at)
    .bind(batch_id)
    .execute(conn)
    .await?;
    trace!("🗃️ OTP stored for batch #{batch_id}");
    Ok(())
}

/// Clears an expired or consumed code.
pub(crate) async fn clear_otp(
    batch_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
        UPDATE delivery_batches
        SET otp_code = NULL, otp_sent_at = NULL, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(batch_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// The OTP compare-and-complete, as one guarded statement: the row only changes if the stored code
/// matches and the batch is still open. Concurrent submissions for the same delivery cannot both
/// succeed because the first winner clears `otp_code`.
pub(crate) async fn complete_if_code_matches(
    batch_id: i64,
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE delivery_batches
        SET status = 'Delivered', otp_code = NULL, otp_sent_at = NULL,
            delivered_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND otp_code = ? AND status NOT IN ('Delivered', 'Cancelled')
        "#,
    )
    .bind(batch_id)
    .bind(code)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
