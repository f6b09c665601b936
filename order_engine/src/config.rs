use std::env;

use chrono::Duration;
use log::*;
use mkp_common::Money;

use crate::{clustering::DEFAULT_PROXIMITY_THRESHOLD_KM, helpers::otp_validity};

const DEFAULT_DELIVERY_FEE_CENTS: i64 = 150;
const DEFAULT_ESTIMATED_DELIVERY: Duration = Duration::minutes(45);

/// Tunables for the order engine. Everything has a sensible default so a bare environment still
/// produces a working engine. Storage connection settings live with the backend, not here.
#[derive(Clone, Debug)]
pub struct OrderEngineConfig {
    /// Anchor-to-store distance within which courier sub-orders share a delivery batch.
    pub proximity_threshold_km: f64,
    /// Flat per-sub-order delivery fee for courier-fulfilled sub-orders.
    pub delivery_fee: Money,
    /// How long a dispatched delivery confirmation code stays valid.
    pub otp_validity: Duration,
    /// Offset added to the placement time to produce the initial delivery estimate.
    pub estimated_delivery_window: Duration,
}

impl Default for OrderEngineConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_km: DEFAULT_PROXIMITY_THRESHOLD_KM,
            delivery_fee: Money::from_cents(DEFAULT_DELIVERY_FEE_CENTS),
            otp_validity: otp_validity(),
            estimated_delivery_window: DEFAULT_ESTIMATED_DELIVERY,
        }
    }
}

impl OrderEngineConfig {
    pub fn from_env_or_default() -> Self {
        let proximity_threshold_km = env::var("MKP_PROXIMITY_THRESHOLD_KM")
            .map(|s| {
                s.parse::<f64>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid value for MKP_PROXIMITY_THRESHOLD_KM. {e} Using \
                         the default, {DEFAULT_PROXIMITY_THRESHOLD_KM}, instead."
                    );
                    DEFAULT_PROXIMITY_THRESHOLD_KM
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PROXIMITY_THRESHOLD_KM);
        let delivery_fee = env::var("MKP_DELIVERY_FEE_CENTS")
            .map(|s| {
                s.parse::<i64>().map(Money::from_cents).unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid value for MKP_DELIVERY_FEE_CENTS. {e} Using the \
                         default, {DEFAULT_DELIVERY_FEE_CENTS}, instead."
                    );
                    Money::from_cents(DEFAULT_DELIVERY_FEE_CENTS)
                })
            })
            .ok()
            .unwrap_or_else(|| Money::from_cents(DEFAULT_DELIVERY_FEE_CENTS));
        let otp_minutes = env::var("MKP_OTP_VALIDITY_MINUTES")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::minutes)
            .unwrap_or_else(otp_validity);
        let estimate_minutes = env::var("MKP_ESTIMATED_DELIVERY_MINUTES")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::minutes)
            .unwrap_or(DEFAULT_ESTIMATED_DELIVERY);
        Self {
            proximity_threshold_km,
            delivery_fee,
            otp_validity: otp_minutes,
            estimated_delivery_window: estimate_minutes,
        }
    }
}
