use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::Coordinates;

#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("{service} is unavailable: {reason}")]
    Unavailable { service: &'static str, reason: String },
}

/// Address components as resolved by a geocoding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressComponents {
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

/// Reverse-geocoding collaborator. A failure here degrades address resolution to placeholder
/// components; it never blocks order placement.
#[allow(async_fn_in_trait)]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, coordinates: Coordinates) -> Result<AddressComponents, CollaboratorError>;
}

/// Geocoder used when no provider is configured. Always reports itself unavailable, which the
/// address resolver treats as "use placeholders".
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGeocoder;

impl Geocoder for NullGeocoder {
    async fn resolve(&self, _coordinates: Coordinates) -> Result<AddressComponents, CollaboratorError> {
        Err(CollaboratorError::Unavailable {
            service: "geocoding",
            reason: "no geocoding provider configured".to_string(),
        })
    }
}

/// Outbound messaging collaborator (SMS/chat). Returns `Ok(true)` only when the message actually
/// reached a delivery channel; failures never surface as order failures.
#[allow(async_fn_in_trait)]
pub trait Messenger: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<bool, CollaboratorError>;
}

/// Messenger used when no SMS provider is configured. Logs the attempt (never the message body,
/// which may hold a delivery code) and reports the message as undelivered.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyMessenger;

impl Messenger for LogOnlyMessenger {
    async fn send(&self, phone: &str, _message: &str) -> Result<bool, CollaboratorError> {
        info!("📨️ No delivery provider configured; dropping message to {phone}");
        Ok(false)
    }
}
