//! Read access to the catalog tables (customers, products, stores, couriers, cart) plus the two
//! mutations the engine owns: the guarded stock decrement and cart clearing.

use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{CartItem, Courier, Customer, Product, Store},
    traits::PurchasedItem,
};

pub async fn customer_by_id(
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Customer>, SqliteDatabaseError> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, name, phone, created_at FROM customers WHERE id = ?",
    )
    .bind(customer_id)
    .fetch_optional(conn)
    .await?;
    Ok(customer)
}

pub async fn product_by_id(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, SqliteDatabaseError> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, seller_id, name, image_url, unit, price, stock, min_order_qty, max_order_qty,
               status
        FROM products WHERE id = ?
        "#,
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

/// Loads the customer's cart, resolving each line against its current product row. The item
/// carries the cart-time unit price, which is the price snapshotted onto the order.
pub async fn cart_for_customer(
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PurchasedItem>, SqliteDatabaseError> {
    let lines = sqlx::query_as::<_, CartItem>(
        r#"
        SELECT id, customer_id, product_id, quantity, unit_price, created_at
        FROM cart_items WHERE customer_id = ? ORDER BY id ASC
        "#,
    )
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let product = product_by_id(line.product_id, conn)
            .await?
            .ok_or(SqliteDatabaseError::ProductNotFound(line.product_id))?;
        items.push(PurchasedItem { product, quantity: line.quantity, unit_price: line.unit_price });
    }
    trace!("🗃️ Loaded {} cart line(s) for customer #{customer_id}", items.len());
    Ok(items)
}

/// Fetches the store for each of the given sellers. A seller with multiple stores contributes its
/// first (lowest id) store.
pub async fn stores_for_sellers(
    seller_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<Store>, SqliteDatabaseError> {
    if seller_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new(
        "SELECT id, seller_id, name, latitude, longitude, self_delivery FROM stores WHERE seller_id IN (",
    );
    let mut in_clause = builder.separated(", ");
    for id in seller_ids {
        in_clause.push_bind(*id);
    }
    builder.push(") ORDER BY id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let stores = builder.build_query_as::<Store>().fetch_all(conn).await?;
    Ok(stores)
}

pub async fn available_couriers(
    conn: &mut SqliteConnection,
) -> Result<Vec<Courier>, SqliteDatabaseError> {
    let couriers = sqlx::query_as::<_, Courier>(
        "SELECT id, name, phone, available FROM couriers WHERE available = 1 ORDER BY id ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(couriers)
}

/// Guarded stock decrement. The `stock >= quantity` predicate makes the check-and-decrement a
/// single atomic statement, so two concurrent checkouts can never jointly oversell a product:
/// whichever commits second affects zero rows and aborts its transaction.
pub async fn decrement_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let result = sqlx::query("UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?")
        .bind(quantity)
        .bind(product_id)
        .bind(quantity)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(SqliteDatabaseError::StockConflict { product_id, requested: quantity });
    }
    trace!("🗃️ Stock for product #{product_id} reduced by {quantity}");
    Ok(())
}

pub async fn clear_cart(
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<u64, SqliteDatabaseError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE customer_id = ?")
        .bind(customer_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
