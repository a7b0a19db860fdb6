//! Engine error taxonomy.
//!
//! Every failure is returned to the caller; the engine does not log, retry,
//! or translate. Cancelling an already-cancelled order is a success, not an
//! error, so it has no variant here.

use thiserror::Error;

/// Errors returned by [`crate::Engine`] operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Limit order with a non-positive price.
    #[error("invalid price: must be positive for limit orders")]
    InvalidPrice,

    /// Non-positive original quantity.
    #[error("invalid quantity: must be positive")]
    InvalidQuantity,

    /// Market order could not be fully satisfied; the book is left untouched.
    #[error("insufficient liquidity: only {available} available, requested {requested}")]
    InsufficientLiquidity { available: i64, requested: i64 },

    /// Unknown order id.
    #[error("order not found")]
    NotFound,

    /// Cancel attempted on an order that already filled completely.
    #[error("cannot cancel: order already filled")]
    AlreadyFilled,
}
