use thiserror::Error;

use crate::traits::OrderGatewayError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),
    #[error("Product not found: {0}")]
    ProductNotFound(i64),
    #[error("Address not found: {0}")]
    AddressNotFound(i64),
    #[error("Order not found: {0}")]
    OrderNotFound(i64),
    #[error("Sub-order not found: {0}")]
    SubOrderNotFound(i64),
    #[error("Delivery batch not found: {0}")]
    BatchNotFound(i64),
    #[error("Insufficient stock for product #{product_id} (requested {requested})")]
    StockConflict { product_id: i64, requested: i64 },
    #[error("Delivery batch #{0} is already assigned")]
    BatchAlreadyAssigned(i64),
    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("Invalid delivery code")]
    InvalidOtp,
    #[error("Delivery code expired")]
    OtpExpired,
    #[error("No delivery code dispatched for batch #{0}")]
    OtpNotRequested(i64),
}

impl From<SqliteDatabaseError> for OrderGatewayError {
    fn from(e: SqliteDatabaseError) -> Self {
        use SqliteDatabaseError::*;
        match e {
            DriverError(e) => OrderGatewayError::DatabaseError(e.to_string()),
            QueryError(msg) => OrderGatewayError::DatabaseError(msg),
            CustomerNotFound(id) => OrderGatewayError::CustomerNotFound(id),
            ProductNotFound(id) => OrderGatewayError::ProductNotFound(id),
            AddressNotFound(id) => OrderGatewayError::AddressNotFound(id),
            OrderNotFound(id) => OrderGatewayError::OrderNotFound(id),
            SubOrderNotFound(id) => OrderGatewayError::SubOrderNotFound(id),
            BatchNotFound(id) => OrderGatewayError::BatchNotFound(id),
            StockConflict { product_id, requested } => {
                OrderGatewayError::StockConflict { product_id, requested }
            },
            BatchAlreadyAssigned(id) => OrderGatewayError::BatchAlreadyAssigned(id),
            IllegalTransition { from, to } => OrderGatewayError::IllegalTransition { from, to },
            NotAuthorized(msg) => OrderGatewayError::NotAuthorized(msg),
            InvalidOtp => OrderGatewayError::InvalidOtp,
            OtpExpired => OrderGatewayError::OtpExpired,
            OtpNotRequested(id) => OrderGatewayError::OtpNotRequested(id),
        }
    }
}
