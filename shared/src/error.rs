//! Client error types

use thiserror::Error;

/// Unified error type for cart and order operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    /// Operation attempted with no bound owner
    #[error("Not signed in")]
    NotSignedIn,

    /// Cart store not yet initialized for this owner
    #[error("Cart is not available yet")]
    CartUnavailable,

    /// Menu item carries no stable identifier
    #[error("Menu item has no identifier")]
    InvalidMenuItem,

    /// Order attempted on a cart with no lines
    #[error("Cart is empty")]
    EmptyCart,

    /// Remote read/write failed; carries the underlying cause
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Malformed remote document; treated as absent for recovery
    #[error("Malformed document: {0}")]
    Decode(String),
}

/// Result type for cart and order operations
pub type AppResult<T> = Result<T, AppError>;
