use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

/// Stable failure categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidInput,
    InsufficientStock,
    Unavailable,
    InvalidTransition,
    Conflict,
    Internal,
}

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Product '{name}' ({product_id}) is not available for ordering")]
    ProductUnavailable { product_id: String, name: String },
    #[error("Insufficient stock for '{name}': requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        requested: u32,
        available: u32,
    },
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl MarketError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::ProductUnavailable { .. } | Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Only transient storage failures are worth retrying; business-rule
    /// rejections will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    /// Message safe to hand back to a caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::InternalError(_) => "Internal error, please retry".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for MarketError {
    fn from(err: std::io::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

impl From<csv::Error> for MarketError {
    fn from(err: csv::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for MarketError {
    fn from(err: rocksdb::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}
