#![allow(dead_code)]

use log::*;
use order_engine::SqliteDatabase;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    format!("sqlite://../data/test_orders_{}.db", rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error connecting to database");
    db.migrate().await.expect("Error running DB migrations");
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {url}");
}

//----- Seeding helpers -----

pub async fn seed_customer(pool: &SqlitePool, name: &str, phone: &str) -> i64 {
    sqlx::query("INSERT INTO customers (name, phone) VALUES (?, ?)")
        .bind(name)
        .bind(phone)
        .execute(pool)
        .await
        .expect("Error seeding customer")
        .last_insert_rowid()
}

pub async fn seed_seller_with_store(
    pool: &SqlitePool,
    name: &str,
    latitude: f64,
    longitude: f64,
    self_delivery: bool,
) -> (i64, i64) {
    let seller_id = sqlx::query("INSERT INTO sellers (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .expect("Error seeding seller")
        .last_insert_rowid();
    let store_id = sqlx::query(
        "INSERT INTO stores (seller_id, name, latitude, longitude, self_delivery) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(seller_id)
    .bind(format!("{name} store"))
    .bind(latitude)
    .bind(longitude)
    .bind(self_delivery)
    .execute(pool)
    .await
    .expect("Error seeding store")
    .last_insert_rowid();
    (seller_id, store_id)
}

pub async fn seed_product(pool: &SqlitePool, seller_id: i64, price_cents: i64, stock: i64) -> i64 {
    sqlx::query(
        "INSERT INTO products (seller_id, name, unit, price, stock) VALUES (?, ?, 'unit', ?, ?)",
    )
    .bind(seller_id)
    .bind(format!("product of seller {seller_id}"))
    .bind(price_cents)
    .bind(stock)
    .execute(pool)
    .await
    .expect("Error seeding product")
    .last_insert_rowid()
}

pub async fn seed_courier(pool: &SqlitePool, name: &str, available: bool) -> i64 {
    sqlx::query("INSERT INTO couriers (name, phone, available) VALUES (?, '0700000000', ?)")
        .bind(name)
        .bind(available)
        .execute(pool)
        .await
        .expect("Error seeding courier")
        .last_insert_rowid()
}

pub async fn add_to_cart(
    pool: &SqlitePool,
    customer_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price_cents: i64,
) {
    sqlx::query(
        "INSERT INTO cart_items (customer_id, product_id, quantity, unit_price) VALUES (?, ?, ?, ?)",
    )
    .bind(customer_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price_cents)
    .execute(pool)
    .await
    .expect("Error seeding cart item");
}

pub async fn seed_address(pool: &SqlitePool, customer_id: i64, latitude: f64, longitude: f64) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO delivery_addresses
            (customer_id, recipient_name, phone, latitude, longitude, city, state, postal_code)
        VALUES (?, 'Test Recipient', '0711111111', ?, ?, 'Nairobi', 'Nairobi', '00100')
        "#,
    )
    .bind(customer_id)
    .bind(latitude)
    .bind(longitude)
    .execute(pool)
    .await
    .expect("Error seeding address")
    .last_insert_rowid()
}

//----- Direct row inspection -----

pub async fn stored_otp(pool: &SqlitePool, batch_id: i64) -> Option<String> {
    sqlx::query_scalar("SELECT otp_code FROM delivery_batches WHERE id = ?")
        .bind(batch_id)
        .fetch_one(pool)
        .await
        .expect("Error reading otp code")
}

pub async fn product_stock(pool: &SqlitePool, product_id: i64) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("Error reading stock")
}

pub async fn cart_len(pool: &SqlitePool, customer_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE customer_id = ?")
        .bind(customer_id)
        .fetch_one(pool)
        .await
        .expect("Error counting cart items")
}
