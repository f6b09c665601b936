use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::{
    db_types::{
        Actor, Courier, Customer, DeliveryAddress, DeliveryBatch, DeliveryBatchStatus, MasterOrder,
        MasterOrderStatus, OrderTracking, Store, SubOrder, SubOrderStatus,
    },
    traits::{CheckoutPlan, OrderWithChildren, PlacedOrder, PurchasedItem},
};

/// This trait defines the persistence behaviour backends must provide for the order engine.
///
/// The contract is deliberately coarse-grained: each method that mutates state is a single atomic
/// unit of work. In particular [`Self::commit_checkout`] persists an entire checkout (address,
/// master order, sub-orders, items, batches, stock decrements, cart clearing) in one transaction,
/// and every status mutation appends its audit trail row inside the same transaction.
#[allow(async_fn_in_trait)]
pub trait OrderGatewayDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    async fn fetch_customer(&self, customer_id: i64) -> Result<Customer, OrderGatewayError>;

    /// Loads the customer's cart joined against current product rows. The returned items carry
    /// the cart-time unit price for snapshotting.
    async fn load_cart(&self, customer_id: i64) -> Result<Vec<PurchasedItem>, OrderGatewayError>;

    /// Loads a single product for a direct ("buy now") purchase at its current price.
    async fn load_direct_item(
        &self,
        product_id: i64,
        quantity: i64,
    ) -> Result<PurchasedItem, OrderGatewayError>;

    /// Fetches the store for each given seller, keyed by seller id.
    async fn stores_for_sellers(
        &self,
        seller_ids: &[i64],
    ) -> Result<HashMap<i64, Store>, OrderGatewayError>;

    async fn available_couriers(&self) -> Result<Vec<Courier>, OrderGatewayError>;

    /// Fetches a saved delivery address, verifying it belongs to the customer.
    async fn fetch_address(
        &self,
        customer_id: i64,
        address_id: i64,
    ) -> Result<DeliveryAddress, OrderGatewayError>;

    /// Applies a checkout plan in one transaction. Stock is re-validated against row state with a
    /// guarded decrement; any failure (stock conflict, missing address, missing rows) rolls the
    /// whole unit back with no partial writes.
    async fn commit_checkout(&self, plan: CheckoutPlan) -> Result<PlacedOrder, OrderGatewayError>;

    async fn fetch_master_order(&self, id: i64) -> Result<MasterOrder, OrderGatewayError>;

    async fn fetch_sub_order(&self, id: i64) -> Result<SubOrder, OrderGatewayError>;

    async fn fetch_batch(&self, id: i64) -> Result<DeliveryBatch, OrderGatewayError>;

    async fn order_with_children(&self, id: i64) -> Result<OrderWithChildren, OrderGatewayError>;

    async fn orders_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<MasterOrder>, OrderGatewayError>;

    /// The customer's orders that are still in a non-terminal state, oldest first.
    async fn open_orders_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<MasterOrder>, OrderGatewayError>;

    /// The append-only tracking trail for a master order, oldest first.
    async fn tracking_for_order(
        &self,
        master_order_id: i64,
    ) -> Result<Vec<OrderTracking>, OrderGatewayError>;

    async fn open_batches_for_courier(
        &self,
        courier_id: i64,
    ) -> Result<Vec<DeliveryBatch>, OrderGatewayError>;

    /// Assigns the batch to the courier and moves it to `Accepted`. Fails with
    /// [`OrderGatewayError::BatchAlreadyAssigned`] if a courier already holds it, and with
    /// [`OrderGatewayError::IllegalTransition`] if the batch has progressed past `Pending` or was
    /// cancelled.
    async fn accept_batch(
        &self,
        courier_id: i64,
        batch_id: i64,
    ) -> Result<DeliveryBatch, OrderGatewayError>;

    /// Transitions a sub-order after verifying the actor may act on it and the transition is
    /// legal. Appends the tracking row in the same transaction.
    async fn advance_sub_order(
        &self,
        actor: Actor,
        sub_order_id: i64,
        new_status: SubOrderStatus,
    ) -> Result<SubOrder, OrderGatewayError>;

    /// Transitions a delivery batch (courier progress updates), mirroring the change onto member
    /// sub-orders where the batch status has a sub-order equivalent.
    async fn advance_batch(
        &self,
        actor: Actor,
        batch_id: i64,
        new_status: DeliveryBatchStatus,
    ) -> Result<DeliveryBatch, OrderGatewayError>;

    /// Stores a freshly generated OTP code and its dispatch timestamp on the batch.
    async fn store_otp(
        &self,
        courier_id: i64,
        batch_id: i64,
        code: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<DeliveryBatch, OrderGatewayError>;

    /// Validates the submitted OTP and, atomically with the check, completes the delivery: batch
    /// to `Delivered`, member sub-orders to `DeliveredByCourier`, the master order to `Delivered`
    /// once every child is delivered, OTP fields cleared, tracking rows appended.
    ///
    /// A code older than `validity` is cleared eagerly and the call fails with `OtpExpired`; a
    /// mismatch fails with `InvalidOtp` and changes nothing.
    async fn complete_delivery(
        &self,
        courier_id: i64,
        batch_id: i64,
        code: &str,
        now: DateTime<Utc>,
        validity: Duration,
    ) -> Result<OrderWithChildren, OrderGatewayError>;

    /// Transitions a master order and cascades per the state machine rules: `Cancelled` cancels
    /// every non-terminal descendant; `Delivered` drives every non-terminal sub-order to its
    /// delivered variant and closes open batches. One tracking row per touched entity.
    async fn update_master_status(
        &self,
        actor: Actor,
        master_order_id: i64,
        new_status: MasterOrderStatus,
        reason: Option<&str>,
    ) -> Result<OrderWithChildren, OrderGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderGatewayError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested customer #{0} does not exist")]
    CustomerNotFound(i64),
    #[error("The requested product #{0} does not exist")]
    ProductNotFound(i64),
    #[error("The requested address #{0} does not exist for this customer")]
    AddressNotFound(i64),
    #[error("The requested order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested sub-order #{0} does not exist")]
    SubOrderNotFound(i64),
    #[error("The requested delivery batch #{0} does not exist")]
    BatchNotFound(i64),
    #[error("Insufficient stock for product #{product_id}: requested {requested}")]
    StockConflict { product_id: i64, requested: i64 },
    #[error("Delivery batch #{0} is already assigned to a courier")]
    BatchAlreadyAssigned(i64),
    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },
    #[error("Actor is not authorized: {0}")]
    NotAuthorized(String),
    #[error("The submitted delivery code is invalid")]
    InvalidOtp,
    #[error("The delivery code has expired; request a new one")]
    OtpExpired,
    #[error("No delivery code has been dispatched for batch #{0}")]
    OtpNotRequested(i64),
}

impl From<sqlx::Error> for OrderGatewayError {
    fn from(e: sqlx::Error) -> Self {
        OrderGatewayError::DatabaseError(e.to_string())
    }
}
