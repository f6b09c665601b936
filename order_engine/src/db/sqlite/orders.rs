use log::{debug, trace};
use mkp_common::Money;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{MasterOrder, MasterOrderStatus, OrderItem, SubOrder, SubOrderStatus},
    traits::{OrderItemDraft, SubOrderDraft},
};

const MASTER_ORDER_COLUMNS: &str = r#"
    id, customer_id, address_id, subtotal, delivery_charge, total, payment_method, payment_status,
    instructions, status, created_at, updated_at
"#;

const SUB_ORDER_COLUMNS: &str = r#"
    id, master_order_id, seller_id, store_id, subtotal, delivery_charge, total, self_delivery,
    status, delivery_batch_id, created_at, updated_at
"#;

/// Inserts the master order row. Not atomic on its own; callers embed this in the checkout
/// transaction by passing `&mut *tx` as the connection.
#[allow(clippy::too_many_arguments)]
pub async fn insert_master_order(
    customer_id: i64,
    address_id: i64,
    subtotal: Money,
    delivery_charge: Money,
    total: Money,
    payment_method: &str,
    instructions: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO master_orders
            (customer_id, address_id, subtotal, delivery_charge, total, payment_method, instructions)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(customer_id)
    .bind(address_id)
    .bind(subtotal)
    .bind(delivery_charge)
    .bind(total)
    .bind(payment_method)
    .bind(instructions)
    .execute(conn)
    .await?;
    let id = result.last_insert_rowid();
    debug!("🗃️ Master order #{id} saved for customer #{customer_id} (total {total})");
    Ok(id)
}

pub async fn insert_sub_order(
    master_order_id: i64,
    draft: &SubOrderDraft,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO sub_orders
            (master_order_id, seller_id, store_id, subtotal, delivery_charge, total, self_delivery)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(master_order_id)
    .bind(draft.seller_id)
    .bind(draft.store_id)
    .bind(draft.subtotal)
    .bind(draft.delivery_charge)
    .bind(draft.total())
    .bind(draft.self_delivery)
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_order_item(
    sub_order_id: i64,
    item: &OrderItemDraft,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO order_items
            (sub_order_id, product_id, product_name, product_image, unit, unit_price, quantity,
             line_total)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(sub_order_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(&item.product_image)
    .bind(&item.unit)
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(item.line_total)
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn fetch_master_order(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<MasterOrder>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, MasterOrder>(&format!(
        "SELECT {MASTER_ORDER_COLUMNS} FROM master_orders WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_sub_order(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<SubOrder>, SqliteDatabaseError> {
    let sub = sqlx::query_as::<_, SubOrder>(&format!(
        "SELECT {SUB_ORDER_COLUMNS} FROM sub_orders WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(sub)
}

pub async fn sub_orders_for_master(
    master_order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<SubOrder>, SqliteDatabaseError> {
    let subs = sqlx::query_as::<_, SubOrder>(&format!(
        "SELECT {SUB_ORDER_COLUMNS} FROM sub_orders WHERE master_order_id = ? ORDER BY id ASC"
    ))
    .bind(master_order_id)
    .fetch_all(conn)
    .await?;
    Ok(subs)
}

pub async fn items_for_sub_order(
    sub_order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, SqliteDatabaseError> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, sub_order_id, product_id, product_name, product_image, unit, unit_price,
               quantity, line_total
        FROM order_items WHERE sub_order_id = ? ORDER BY id ASC
        "#,
    )
    .bind(sub_order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

//--------------------------------------  OrderQueryFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    customer_id: Option<i64>,
    statuses: Vec<MasterOrderStatus>,
}

impl OrderQueryFilter {
    pub fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_status(mut self, status: MasterOrderStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.statuses.is_empty()
    }
}

/// Fetches master orders according to the filter, oldest first.
pub async fn fetch_master_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<MasterOrder>, SqliteDatabaseError> {
    let mut builder =
        QueryBuilder::new(format!("SELECT {MASTER_ORDER_COLUMNS} FROM master_orders "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(customer_id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if !query.statuses.is_empty() {
        let statuses =
            query.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    builder.push(" ORDER BY created_at ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<MasterOrder>().fetch_all(conn).await?;
    Ok(orders)
}

pub(crate) async fn update_master_status(
    id: i64,
    status: MasterOrderStatus,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let status = status.to_string();
    sqlx::query(
        "UPDATE master_orders SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(status)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn update_sub_order_status(
    id: i64,
    status: SubOrderStatus,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let status = status.to_string();
    sqlx::query("UPDATE sub_orders SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn link_sub_order_to_batch(
    sub_order_id: i64,
    batch_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        "UPDATE sub_orders SET delivery_batch_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(batch_id)
    .bind(sub_order_id)
    .execute(conn)
    .await?;
    Ok(())
}
