use chrono::{DateTime, Utc};
use mkp_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{
    AddressSelector, Coordinates, DeliveryAddress, DeliveryBatch, MasterOrder, OrderItem, Product,
    SubOrder,
};

//--------------------------------------   PurchasedItem     ---------------------------------------------------------
/// A resolved purchasable line: the product row as read at resolution time, the requested
/// quantity, and the unit price to snapshot (cart-time price for cart checkouts, current price for
/// direct purchases).
#[derive(Debug, Clone)]
pub struct PurchasedItem {
    pub product: Product,
    pub quantity: i64,
    pub unit_price: Money,
}

impl PurchasedItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------   OrderItemDraft    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemDraft {
    pub product_id: i64,
    pub product_name: String,
    pub product_image: Option<String>,
    pub unit: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

//--------------------------------------   SubOrderDraft     ---------------------------------------------------------
/// One seller's portion of a checkout, before anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubOrderDraft {
    pub seller_id: i64,
    pub store_id: i64,
    pub store_coordinates: Coordinates,
    pub self_delivery: bool,
    pub subtotal: Money,
    pub delivery_charge: Money,
    pub items: Vec<OrderItemDraft>,
}

impl SubOrderDraft {
    pub fn total(&self) -> Money {
        self.subtotal + self.delivery_charge
    }
}

//--------------------------------------     BatchDraft      ---------------------------------------------------------
/// A planned delivery batch. `member_indices` point into the sub-order draft list of the owning
/// [`CheckoutPlan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDraft {
    pub courier_id: Option<i64>,
    pub otp_code: String,
    pub estimated_delivery_at: DateTime<Utc>,
    pub member_indices: Vec<usize>,
}

//--------------------------------------    CheckoutPlan     ---------------------------------------------------------
/// Everything the transaction coordinator needs to persist one checkout atomically. The plan is
/// produced by pure computation (resolution, drafting, clustering); the storage layer re-validates
/// stock against row state when it applies the plan.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub customer_id: i64,
    pub address: AddressSelector,
    pub payment_method: String,
    pub instructions: Option<String>,
    pub subtotal: Money,
    pub delivery_charge: Money,
    pub total: Money,
    pub sub_orders: Vec<SubOrderDraft>,
    pub batches: Vec<BatchDraft>,
    /// Clear the customer's cart inside the same transaction (cart-originated checkout only).
    pub clear_cart: bool,
}

//--------------------------------------    PlacedOrder      ---------------------------------------------------------
/// The persisted result of a committed checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: MasterOrder,
    pub sub_orders: Vec<SubOrder>,
    pub batches: Vec<DeliveryBatch>,
    pub address: DeliveryAddress,
}

//--------------------------------------  OrderWithChildren  ---------------------------------------------------------
/// Read-side aggregate for a master order. `items` holds the order lines of every sub-order;
/// each line carries its `sub_order_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithChildren {
    pub order: MasterOrder,
    pub sub_orders: Vec<SubOrder>,
    pub batches: Vec<DeliveryBatch>,
    pub items: Vec<OrderItem>,
}
