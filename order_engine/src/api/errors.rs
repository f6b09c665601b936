use thiserror::Error;

use crate::{checkout::CheckoutError, traits::OrderGatewayError};

/// The error surface of [`crate::api::order_flow_api::OrderFlowApi`]. Each variant corresponds to
/// a distinct caller remedy: fix the request, retry, re-request a code, or give up.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Invalid order request: {0}")]
    Validation(String),
    #[error("{0}")]
    PriceMismatch(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("{0}")]
    StockConflict(String),
    #[error("{0}")]
    BatchAlreadyAssigned(String),
    #[error("{0}")]
    IllegalTransition(String),
    #[error("The submitted delivery code is invalid")]
    InvalidOtp,
    #[error("The delivery code has expired; request a new one")]
    OtpExpired,
    #[error("No delivery code has been dispatched for this batch")]
    OtpNotRequested,
    #[error("A collaborating service is degraded: {0}")]
    ServiceDegraded(String),
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<CheckoutError> for OrderFlowError {
    fn from(e: CheckoutError) -> Self {
        match &e {
            CheckoutError::PriceMismatch { .. } => OrderFlowError::PriceMismatch(e.to_string()),
            CheckoutError::InsufficientStock { .. } => OrderFlowError::StockConflict(e.to_string()),
            _ => OrderFlowError::Validation(e.to_string()),
        }
    }
}

impl From<OrderGatewayError> for OrderFlowError {
    fn from(e: OrderGatewayError) -> Self {
        use OrderGatewayError::*;
        match &e {
            DatabaseError(_) => OrderFlowError::DatabaseError(e.to_string()),
            CustomerNotFound(_) | ProductNotFound(_) | AddressNotFound(_) | OrderNotFound(_)
            | SubOrderNotFound(_) | BatchNotFound(_) => OrderFlowError::NotFound(e.to_string()),
            StockConflict { .. } => OrderFlowError::StockConflict(e.to_string()),
            BatchAlreadyAssigned(_) => OrderFlowError::BatchAlreadyAssigned(e.to_string()),
            IllegalTransition { .. } => OrderFlowError::IllegalTransition(e.to_string()),
            NotAuthorized(reason) => OrderFlowError::NotAuthorized(reason.clone()),
            InvalidOtp => OrderFlowError::InvalidOtp,
            OtpExpired => OrderFlowError::OtpExpired,
            OtpNotRequested(_) => OrderFlowError::OtpNotRequested,
        }
    }
}
