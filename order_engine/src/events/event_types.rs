use serde::{Deserialize, Serialize};

use crate::db_types::{
    DeliveryBatch, MasterOrder, MasterOrderStatus, SubOrder, SubOrderStatus,
};

/// Fired once per placed order, after the checkout transaction has committed.
#[derive(Debug, Clone)]
pub struct OrderPlacedEvent {
    pub order: MasterOrder,
    pub sub_orders: Vec<SubOrder>,
    pub batches: Vec<DeliveryBatch>,
}

impl OrderPlacedEvent {
    pub fn new(order: MasterOrder, sub_orders: Vec<SubOrder>, batches: Vec<DeliveryBatch>) -> Self {
        Self { order, sub_orders, batches }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubOrderStatusChangedEvent {
    pub sub_order: SubOrder,
    pub old_status: SubOrderStatus,
}

impl SubOrderStatusChangedEvent {
    pub fn new(sub_order: SubOrder, old_status: SubOrderStatus) -> Self {
        Self { sub_order, old_status }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAcceptedEvent {
    pub batch: DeliveryBatch,
    pub courier_id: i64,
}

impl BatchAcceptedEvent {
    pub fn new(batch: DeliveryBatch) -> Self {
        let courier_id = batch.courier_id.unwrap_or_default();
        Self { batch, courier_id }
    }
}

/// Carries the code and the customer's phone number so a notification hook can dispatch the SMS.
/// This event is the only place the raw code leaves the engine; it is never logged.
#[derive(Debug, Clone)]
pub struct DeliveryOtpEvent {
    pub batch_id: i64,
    pub master_order_id: i64,
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryCompletedEvent {
    pub batch: DeliveryBatch,
    pub order: MasterOrder,
}

impl DeliveryCompletedEvent {
    pub fn new(batch: DeliveryBatch, order: MasterOrder) -> Self {
        Self { batch, order }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: MasterOrder,
    pub old_status: MasterOrderStatus,
}

impl OrderStatusChangedEvent {
    pub fn new(order: MasterOrder, old_status: MasterOrderStatus) -> Self {
        Self { order, old_status }
    }
}
