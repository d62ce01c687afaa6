use axum::http::StatusCode;
use ethers::types::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("Payment channel not found: {0:?}")]
    ChannelNotFound(Address),
    #[error("Lane allocator does not know channel {0:?}")]
    UnknownChannel(Address),
    #[error("Payment channel from {payer:?} to {payee:?} already exists")]
    ChannelExists { payer: Address, payee: Address },
    #[error("Message submission failed: {0}")]
    SubmissionFailed(String),
    #[error("Payment channel creation failed: {0}")]
    ChannelCreationFailed(String),
    #[error("Waiting for confirmation failed: {0}")]
    WaitFailed(String),
    #[error("Signing failed: {0}")]
    SignError(String),
    #[error("Nonce unavailable: {0}")]
    NonceError(String),
    #[error("Balance unavailable for {0:?}")]
    BalanceUnavailable(Address),
    #[error("Insufficient channel funds: available {available}, requested {requested}")]
    InsufficientFunds { available: String, requested: String },
    #[error("Undefined address")]
    UndefinedAddress,
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Request is not authorized")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

impl From<ConnectorError> for StatusCode {
    fn from(error: ConnectorError) -> Self {
        match error {
            ConnectorError::ChannelNotFound(_) | ConnectorError::UnknownChannel(_) => {
                StatusCode::NOT_FOUND
            }
            ConnectorError::ChannelExists { .. } => StatusCode::CONFLICT,
            ConnectorError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            ConnectorError::BalanceUnavailable(_) => StatusCode::NOT_FOUND,
            ConnectorError::UndefinedAddress | ConnectorError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ConnectorError::Unauthorized => StatusCode::UNAUTHORIZED,
            ConnectorError::WaitFailed(_) | ConnectorError::Cancelled => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ConnectorError::SubmissionFailed(_) | ConnectorError::ChannelCreationFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            ConnectorError::SignError(_) | ConnectorError::NonceError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
