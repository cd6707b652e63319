//! Error types for complexratio

use thiserror::Error;

/// Core error type for complexratio operations
#[derive(Debug, Error)]
pub enum RatioError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl RatioError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RatioError>;
