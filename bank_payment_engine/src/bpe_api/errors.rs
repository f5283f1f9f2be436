use thiserror::Error;

use crate::{
    db_types::{OrderId, PaymentStatus},
    helpers::InvalidReferencePrefix,
};

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} has already been settled")]
    AlreadySettled(OrderId),
    #[error("The payment gateway could not be reached: {0}")]
    UpstreamUnavailable(String),
    #[error("Could not interpret the gateway transaction: {0}")]
    TransferConversionError(String),
}

#[derive(Debug, Clone, Error)]
pub enum QrCodeError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} cannot be paid because its payment status is {1}")]
    AlreadySettled(OrderId, PaymentStatus),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid QR code configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<InvalidReferencePrefix> for QrCodeError {
    fn from(e: InvalidReferencePrefix) -> Self {
        Self::InvalidConfiguration(e.to_string())
    }
}
