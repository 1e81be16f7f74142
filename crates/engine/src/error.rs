//! The module contains the error the engine can throw.
//!
//! Validation errors ([`InvalidAmount`], [`InvalidCategory`],
//! [`InvalidPaymentMethod`], [`InvalidDay`]) never touch the database, while
//! [`Database`] means the write did not commit.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidCategory`]: EngineError::InvalidCategory
//!  [`InvalidPaymentMethod`]: EngineError::InvalidPaymentMethod
//!  [`InvalidDay`]: EngineError::InvalidDay
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),
    #[error("Invalid day of month: {0}")]
    InvalidDay(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// `true` for errors caused by user input rather than storage.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidCategory(a), Self::InvalidCategory(b)) => a == b,
            (Self::InvalidPaymentMethod(a), Self::InvalidPaymentMethod(b)) => a == b,
            (Self::InvalidDay(a), Self::InvalidDay(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
