use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bank_payment_engine::{PaymentGatewayError, QrCodeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The order cannot be paid. {0}")]
    AlreadySettled(String),
    #[error("The payment gateway is unavailable. {0}")]
    UpstreamUnavailable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::WebhookSecretMismatch => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::AlreadySettled(_) => StatusCode::CONFLICT,
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The webhook API key does not match.")]
    WebhookSecretMismatch,
}

impl From<PaymentGatewayError> for ServerError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            PaymentGatewayError::AlreadySettled(_) => Self::AlreadySettled(e.to_string()),
            PaymentGatewayError::UpstreamUnavailable(s) => Self::UpstreamUnavailable(s),
            PaymentGatewayError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            PaymentGatewayError::TransferConversionError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<QrCodeError> for ServerError {
    fn from(e: QrCodeError) -> Self {
        match e {
            QrCodeError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            QrCodeError::AlreadySettled(..) => Self::AlreadySettled(e.to_string()),
            QrCodeError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            QrCodeError::InvalidConfiguration(_) => Self::ConfigurationError(e.to_string()),
        }
    }
}
