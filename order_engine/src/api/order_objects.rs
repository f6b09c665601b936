use mkp_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::AddressSelector;

/// The client-supplied portion of a checkout. The declared amounts are what the client's UI
/// displayed; the engine recomputes every amount server-side and rejects the checkout on any
/// mismatch beyond one minor unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub address: AddressSelector,
    pub payment_method: String,
    pub instructions: Option<String>,
    pub declared_subtotal: Money,
    pub declared_delivery_charge: Money,
    pub declared_total: Money,
}
