//! # Order engine public API
//!
//! The `api` module exposes the programmatic surface of the order engine. An API instance is
//! created by supplying a storage backend that implements [`crate::traits::OrderGatewayDatabase`],
//! so different deployments can swap in different backends without touching flow logic.
//!
//! * [`order_flow_api`] is the primary entry point: checkout (cart and direct), delivery batch
//!   acceptance, status progression, the OTP delivery-confirmation flow, and admin overrides.
//! * [`order_objects`] holds the request/response value types.

pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
