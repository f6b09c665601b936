//! Master order status overrides: authorization, cascades to sub-orders and batches, and the
//! audit trail they leave behind.

mod support;

use mkp_common::Money;
use order_engine::{
    db_types::{Actor, AddressSelector, DeliveryBatchStatus, MasterOrderStatus, SubOrderStatus},
    events::EventProducers,
    CheckoutRequest, OrderEngineConfig, OrderFlowApi, OrderFlowError, SqliteDatabase,
};
use support::*;

const CUSTOMER_LAT: f64 = -1.2900;
const CUSTOMER_LNG: f64 = 36.8200;

fn config() -> OrderEngineConfig {
    OrderEngineConfig { delivery_fee: Money::from_cents(150), ..Default::default() }
}

struct Fixture {
    api: OrderFlowApi<SqliteDatabase>,
    customer_id: i64,
    order_id: i64,
}

/// One courier-delivered and one self-delivery sub-order, with one batch.
async fn fixture(url: &str) -> Fixture {
    prepare_test_env(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating database");
    let pool = db.pool().clone();
    let customer_id = seed_customer(&pool, "Alice", "0712345678").await;
    let address_id = seed_address(&pool, customer_id, CUSTOMER_LAT, CUSTOMER_LNG).await;
    let (seller_a, _) =
        seed_seller_with_store(&pool, "near", CUSTOMER_LAT + 0.005, CUSTOMER_LNG, false).await;
    let (seller_b, _) =
        seed_seller_with_store(&pool, "selfd", CUSTOMER_LAT + 0.010, CUSTOMER_LNG, true).await;
    let p1 = seed_product(&pool, seller_a, 250, 10).await;
    let p2 = seed_product(&pool, seller_b, 1_000, 10).await;
    seed_courier(&pool, "Carl", true).await;
    add_to_cart(&pool, customer_id, p1, 2, 250).await;
    add_to_cart(&pool, customer_id, p2, 1, 1_000).await;

    let api = OrderFlowApi::new(db, EventProducers::default(), config());
    let request = CheckoutRequest {
        address: AddressSelector::Existing(address_id),
        payment_method: "cash_on_delivery".to_string(),
        instructions: None,
        declared_subtotal: Money::from_cents(1_500),
        declared_delivery_charge: Money::from_cents(150),
        declared_total: Money::from_cents(1_650),
    };
    let placed = api.place_order_from_cart(customer_id, request).await.expect("Error placing order");
    Fixture { api, customer_id, order_id: placed.order.id }
}

#[tokio::test]
async fn cancellation_cascades_to_every_open_descendant() {
    let url = random_db_path();
    let f = fixture(&url).await;
    assert_eq!(f.api.open_orders_for_customer(f.customer_id).await.unwrap().len(), 1);
    let result = f
        .api
        .update_master_order_status(
            Actor::admin(1),
            f.order_id,
            MasterOrderStatus::Cancelled,
            Some("customer unreachable"),
        )
        .await
        .unwrap();

    assert_eq!(result.order.status, MasterOrderStatus::Cancelled);
    assert!(result.sub_orders.iter().all(|s| s.status == SubOrderStatus::Cancelled));
    assert!(result.batches.iter().all(|b| b.status == DeliveryBatchStatus::Cancelled));

    let trail = f.api.tracking_for_order(f.order_id).await.unwrap();
    // one cancellation row per entity: master + 2 sub-orders + 1 batch
    let cancelled = trail.iter().filter(|t| t.status == "Cancelled").count();
    assert_eq!(cancelled, 4);
    let master_row = trail
        .iter()
        .find(|t| t.status == "Cancelled" && t.sub_order_id.is_none() && t.delivery_batch_id.is_none())
        .unwrap();
    assert!(master_row.message.contains("customer unreachable"));

    // a cancelled order no longer counts as open
    assert!(f.api.open_orders_for_customer(f.customer_id).await.unwrap().is_empty());
    assert_eq!(f.api.orders_for_customer(f.customer_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn admin_delivery_override_closes_everything() {
    let url = random_db_path();
    let f = fixture(&url).await;
    let result = f
        .api
        .update_master_order_status(Actor::admin(1), f.order_id, MasterOrderStatus::Delivered, None)
        .await
        .unwrap();

    assert_eq!(result.order.status, MasterOrderStatus::Delivered);
    // each sub-order is closed with the delivered variant matching its fulfilment mode
    for sub in &result.sub_orders {
        let expected = if sub.self_delivery {
            SubOrderStatus::DeliveredBySeller
        } else {
            SubOrderStatus::DeliveredByCourier
        };
        assert_eq!(sub.status, expected);
    }
    assert!(result.batches.iter().all(|b| b.status == DeliveryBatchStatus::Delivered));
}

#[tokio::test]
async fn terminal_orders_refuse_further_transitions() {
    let url = random_db_path();
    let f = fixture(&url).await;
    f.api
        .update_master_order_status(Actor::admin(1), f.order_id, MasterOrderStatus::Delivered, None)
        .await
        .unwrap();
    let err = f
        .api
        .update_master_order_status(Actor::admin(1), f.order_id, MasterOrderStatus::Cancelled, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderFlowError::IllegalTransition(_)), "got {err:?}");
}

#[tokio::test]
async fn customers_may_cancel_only_their_own_orders() {
    let url = random_db_path();
    let f = fixture(&url).await;
    let err = f
        .api
        .update_master_order_status(
            Actor::customer(f.customer_id + 1),
            f.order_id,
            MasterOrderStatus::Cancelled,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrderFlowError::NotAuthorized(_)), "got {err:?}");

    let result = f
        .api
        .update_master_order_status(
            Actor::customer(f.customer_id),
            f.order_id,
            MasterOrderStatus::Cancelled,
            Some("changed my mind"),
        )
        .await
        .unwrap();
    assert_eq!(result.order.status, MasterOrderStatus::Cancelled);
}

#[tokio::test]
async fn sellers_and_couriers_cannot_override_the_master_order() {
    let url = random_db_path();
    let f = fixture(&url).await;
    for actor in [Actor::seller(1), Actor::courier(1), Actor::customer(f.customer_id)] {
        let err = f
            .api
            .update_master_order_status(actor, f.order_id, MasterOrderStatus::Confirmed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderFlowError::NotAuthorized(_)), "got {err:?}");
    }
    // the admin path works
    let result = f
        .api
        .update_master_order_status(Actor::admin(1), f.order_id, MasterOrderStatus::Confirmed, None)
        .await
        .unwrap();
    assert_eq!(result.order.status, MasterOrderStatus::Confirmed);
}
