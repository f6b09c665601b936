use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mkp_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct StatusConversionError(pub String);

//--------------------------------------     Coordinates     ---------------------------------------------------------
/// A latitude/longitude pair. A zero or non-finite pair is treated as "unknown location" by the
/// distance utility, which returns a sentinel distance instead of a bogus small one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && !(self.latitude == 0.0 && self.longitude == 0.0)
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }
}

impl Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

//--------------------------------------     Actor & Role    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ActorRole {
    Customer,
    Seller,
    Courier,
    Admin,
    System,
}

impl Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorRole::Customer => write!(f, "Customer"),
            ActorRole::Seller => write!(f, "Seller"),
            ActorRole::Courier => write!(f, "Courier"),
            ActorRole::Admin => write!(f, "Admin"),
            ActorRole::System => write!(f, "System"),
        }
    }
}

impl FromStr for ActorRole {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(Self::Customer),
            "Seller" => Ok(Self::Seller),
            "Courier" => Ok(Self::Courier),
            "Admin" => Ok(Self::Admin),
            "System" => Ok(Self::System),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

/// The authenticated principal performing an operation, as supplied by the auth context provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: i64, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn customer(id: i64) -> Self {
        Self::new(id, ActorRole::Customer)
    }

    pub fn seller(id: i64) -> Self {
        Self::new(id, ActorRole::Seller)
    }

    pub fn courier(id: i64) -> Self {
        Self::new(id, ActorRole::Courier)
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, ActorRole::Admin)
    }

    pub fn system() -> Self {
        Self::new(0, ActorRole::System)
    }
}

//--------------------------------------  MasterOrderStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum MasterOrderStatus {
    /// The order has been placed but no seller has started work on it yet.
    Pending,
    /// The order has been acknowledged and sellers are preparing it.
    Confirmed,
    /// At least one delivery run for this order is underway.
    OutForDelivery,
    /// Every sub-order has been handed to the customer. Terminal.
    Delivered,
    /// The order was cancelled by the customer or an admin. Terminal.
    Cancelled,
}

impl Display for MasterOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasterOrderStatus::Pending => write!(f, "Pending"),
            MasterOrderStatus::Confirmed => write!(f, "Confirmed"),
            MasterOrderStatus::OutForDelivery => write!(f, "OutForDelivery"),
            MasterOrderStatus::Delivered => write!(f, "Delivered"),
            MasterOrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for MasterOrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "OutForDelivery" => Ok(Self::OutForDelivery),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

//--------------------------------------   SubOrderStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SubOrderStatus {
    Pending,
    Processing,
    ReadyForPickup,
    PickedUp,
    OutForDelivery,
    /// Handed over by the courier after OTP confirmation. Terminal.
    DeliveredByCourier,
    /// Fulfilled by the seller's own delivery. Terminal.
    DeliveredBySeller,
    Cancelled,
}

impl Display for SubOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubOrderStatus::Pending => write!(f, "Pending"),
            SubOrderStatus::Processing => write!(f, "Processing"),
            SubOrderStatus::ReadyForPickup => write!(f, "ReadyForPickup"),
            SubOrderStatus::PickedUp => write!(f, "PickedUp"),
            SubOrderStatus::OutForDelivery => write!(f, "OutForDelivery"),
            SubOrderStatus::DeliveredByCourier => write!(f, "DeliveredByCourier"),
            SubOrderStatus::DeliveredBySeller => write!(f, "DeliveredBySeller"),
            SubOrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for SubOrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "ReadyForPickup" => Ok(Self::ReadyForPickup),
            "PickedUp" => Ok(Self::PickedUp),
            "OutForDelivery" => Ok(Self::OutForDelivery),
            "DeliveredByCourier" => Ok(Self::DeliveredByCourier),
            "DeliveredBySeller" => Ok(Self::DeliveredBySeller),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

//-------------------------------------- DeliveryBatchStatus ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DeliveryBatchStatus {
    Pending,
    Accepted,
    PickedUp,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl Display for DeliveryBatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryBatchStatus::Pending => write!(f, "Pending"),
            DeliveryBatchStatus::Accepted => write!(f, "Accepted"),
            DeliveryBatchStatus::PickedUp => write!(f, "PickedUp"),
            DeliveryBatchStatus::OutForDelivery => write!(f, "OutForDelivery"),
            DeliveryBatchStatus::Delivered => write!(f, "Delivered"),
            DeliveryBatchStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for DeliveryBatchStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "PickedUp" => Ok(Self::PickedUp),
            "OutForDelivery" => Ok(Self::OutForDelivery),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

//--------------------------------------    ProductStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ProductStatus {
    Draft,
    Approved,
    Suspended,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Draft => write!(f, "Draft"),
            ProductStatus::Approved => write!(f, "Approved"),
            ProductStatus::Suspended => write!(f, "Suspended"),
        }
    }
}

//--------------------------------------      Customer       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Store         ---------------------------------------------------------
/// A seller's pickup location. The `self_delivery` flag decides whether the seller's sub-orders
/// bypass courier batching entirely.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub self_delivery: bool,
}

impl Store {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

//--------------------------------------      Courier        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Courier {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub available: bool,
}

//--------------------------------------      Product        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub unit: String,
    pub price: Money,
    pub stock: i64,
    pub min_order_qty: i64,
    pub max_order_qty: Option<i64>,
    pub status: ProductStatus,
}

//--------------------------------------      CartItem       ---------------------------------------------------------
/// A line in the customer's persistent cart. `unit_price` is the price at the time the item was
/// added, which is also the price snapshotted onto the order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  DeliveryAddress    ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub id: i64,
    pub customer_id: i64,
    pub recipient_name: String,
    pub phone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub created_at: DateTime<Utc>,
}

impl DeliveryAddress {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Single composed display string. The address is stored normalized only; this accessor
    /// replaces any denormalized snapshot.
    pub fn display_string(&self) -> String {
        format!("{}, {}, {} {}", self.recipient_name, self.city, self.state, self.postal_code)
    }
}

/// Fields for persisting a brand-new address during checkout. Missing optional components are
/// defaulted rather than rejected, so partial address data never blocks order placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAddress {
    pub recipient_name: Option<String>,
    pub phone: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

/// Either an existing saved address (verified to belong to the customer) or a new one to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AddressSelector {
    Existing(i64),
    New(NewAddress),
}

//--------------------------------------    MasterOrder      ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MasterOrder {
    pub id: i64,
    pub customer_id: i64,
    pub address_id: i64,
    pub subtotal: Money,
    pub delivery_charge: Money,
    pub total: Money,
    pub payment_method: String,
    pub payment_status: String,
    pub instructions: Option<String>,
    pub status: MasterOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     SubOrder        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubOrder {
    pub id: i64,
    pub master_order_id: i64,
    pub seller_id: i64,
    pub store_id: i64,
    pub subtotal: Money,
    pub delivery_charge: Money,
    pub total: Money,
    pub self_delivery: bool,
    pub status: SubOrderStatus,
    pub delivery_batch_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     OrderItem       ---------------------------------------------------------
/// A line item under a sub-order. Name, image, unit and price are snapshotted at order time so
/// later catalog edits never affect historical orders.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub sub_order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_image: Option<String>,
    pub unit: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

//--------------------------------------   DeliveryBatch     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryBatch {
    pub id: i64,
    pub master_order_id: i64,
    pub courier_id: Option<i64>,
    pub address_id: i64,
    pub status: DeliveryBatchStatus,
    pub otp_code: Option<String>,
    pub otp_sent_at: Option<DateTime<Utc>>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   OrderTracking     ---------------------------------------------------------
/// Append-only audit entry. One row is written for every status transition, direct or cascaded.
/// Rows are never mutated or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderTracking {
    pub id: i64,
    pub master_order_id: i64,
    pub sub_order_id: Option<i64>,
    pub delivery_batch_id: Option<i64>,
    pub status: String,
    pub actor_id: i64,
    pub actor_role: ActorRole,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [
            MasterOrderStatus::Pending,
            MasterOrderStatus::Confirmed,
            MasterOrderStatus::OutForDelivery,
            MasterOrderStatus::Delivered,
            MasterOrderStatus::Cancelled,
        ] {
            assert_eq!(s.to_string().parse::<MasterOrderStatus>().unwrap(), s);
        }
        for s in [
            SubOrderStatus::Pending,
            SubOrderStatus::Processing,
            SubOrderStatus::ReadyForPickup,
            SubOrderStatus::PickedUp,
            SubOrderStatus::OutForDelivery,
            SubOrderStatus::DeliveredByCourier,
            SubOrderStatus::DeliveredBySeller,
            SubOrderStatus::Cancelled,
        ] {
            assert_eq!(s.to_string().parse::<SubOrderStatus>().unwrap(), s);
        }
        assert!("NotAStatus".parse::<SubOrderStatus>().is_err());
    }

    #[test]
    fn coordinate_validity() {
        assert!(Coordinates::new(-1.2921, 36.8219).is_valid());
        assert!(!Coordinates::new(0.0, 0.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 36.8).is_valid());
        assert!(!Coordinates::new(91.0, 0.5).is_valid());
    }

    #[test]
    fn address_display_string() {
        let addr = DeliveryAddress {
            id: 1,
            customer_id: 1,
            recipient_name: "Asha".to_string(),
            phone: "0700000000".to_string(),
            latitude: -1.28,
            longitude: 36.82,
            city: "Nairobi".to_string(),
            state: "Nairobi".to_string(),
            postal_code: "00100".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(addr.display_string(), "Asha, Nairobi, Nairobi 00100");
    }
}
