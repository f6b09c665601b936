//! Marketplace order engine
//!
//! The order engine is the transactional core of a multi-vendor marketplace: it turns a cart (or
//! a single "buy now" product) into a master order with one sub-order per seller, groups
//! courier-fulfilled sub-orders into delivery batches by store proximity, and drives orders,
//! sub-orders and batches through their lifecycles with an append-only audit trail. It is
//! storefront-agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). Currently SQLite is the supported backend.
//!    You should never need to access the database directly; use the public API instead. The
//!    exception is the data types used in the database, defined in [`db_types`], which are public.
//! 2. The engine public API ([`mod@api`]). This provides the public-facing functionality:
//!    checkout, delivery batch acceptance, status progression, the OTP delivery-confirmation flow
//!    and admin overrides. Backends implement the traits in [`traits`] to drive it.
//!
//! The engine also emits events after each state-changing transaction commits. A simple actor
//! framework in [`events`] lets you hook into these (order placed, batch accepted, delivery code
//! dispatched, delivery completed) and perform custom actions such as sending notifications.
mod db;

pub mod api;
pub mod checkout;
pub mod clustering;
pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
mod status;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;

pub use api::{errors::OrderFlowError, order_flow_api::OrderFlowApi, order_objects::CheckoutRequest};
pub use clustering::{AssignmentPolicy, FirstAvailable, DEFAULT_PROXIMITY_THRESHOLD_KM};
pub use config::OrderEngineConfig;
pub use traits::{OrderGatewayDatabase, OrderGatewayError};
