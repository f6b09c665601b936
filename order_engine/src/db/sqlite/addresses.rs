use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Customer, DeliveryAddress, NewAddress},
};

/// Placeholder components used when an address arrives with partial data. Order placement is
/// deliberately resilient to unknown city/state/postal code.
pub const UNKNOWN_COMPONENT: &str = "Unknown";
pub const UNKNOWN_POSTAL_CODE: &str = "00000";

/// Fetches an address and verifies it belongs to the given customer. Ownership failures and
/// missing rows are indistinguishable to the caller by design.
pub async fn address_for_customer(
    address_id: i64,
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryAddress>, SqliteDatabaseError> {
    let address = sqlx::query_as::<_, DeliveryAddress>(
        r#"
        SELECT id, customer_id, recipient_name, phone, latitude, longitude, city, state,
               postal_code, created_at
        FROM delivery_addresses WHERE id = ? AND customer_id = ?
        "#,
    )
    .bind(address_id)
    .bind(customer_id)
    .fetch_optional(conn)
    .await?;
    Ok(address)
}

pub async fn address_by_id(
    address_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryAddress>, SqliteDatabaseError> {
    let address = sqlx::query_as::<_, DeliveryAddress>(
        r#"
        SELECT id, customer_id, recipient_name, phone, latitude, longitude, city, state,
               postal_code, created_at
        FROM delivery_addresses WHERE id = ?
        "#,
    )
    .bind(address_id)
    .fetch_optional(conn)
    .await?;
    Ok(address)
}

/// Persists a new address, defaulting missing recipient/phone from the customer profile and
/// missing components to placeholders. Returns the stored, normalized record.
pub async fn insert_address(
    customer: &Customer,
    address: &NewAddress,
    conn: &mut SqliteConnection,
) -> Result<DeliveryAddress, SqliteDatabaseError> {
    let recipient_name = address.recipient_name.clone().unwrap_or_else(|| customer.name.clone());
    let phone = address.phone.clone().unwrap_or_else(|| customer.phone.clone());
    let city = address.city.clone().unwrap_or_else(|| UNKNOWN_COMPONENT.to_string());
    let state = address.state.clone().unwrap_or_else(|| UNKNOWN_COMPONENT.to_string());
    let postal_code = address.postal_code.clone().unwrap_or_else(|| UNKNOWN_POSTAL_CODE.to_string());
    let result = sqlx::query(
        r#"
        INSERT INTO delivery_addresses
            (customer_id, recipient_name, phone, latitude, longitude, city, state, postal_code)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(customer.id)
    .bind(&recipient_name)
    .bind(&phone)
    .bind(address.latitude)
    .bind(address.longitude)
    .bind(&city)
    .bind(&state)
    .bind(&postal_code)
    .execute(&mut *conn)
    .await?;
    let id = result.last_insert_rowid();
    debug!("🗃️ New delivery address #{id} saved for customer #{}", customer.id);
    address_by_id(id, conn)
        .await?
        .ok_or(SqliteDatabaseError::AddressNotFound(id))
}
