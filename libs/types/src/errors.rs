//! Error taxonomy for the matching simulator
//!
//! Two families: contract violations ([`OrderError`]), which abort the
//! offending operation without mutating state, and rejected submissions
//! ([`SubmitError`]), which are reported to the caller and never enqueued.
//! Cancel misses are plain `bool` returns and CSV row failures are
//! collected per line in the import report; neither is an error type.

use thiserror::Error;

use crate::order::OrderStatus;

/// Contract violations on order and book operations.
///
/// These indicate a programming error in the caller. The operation that
/// detects one returns the error and leaves its state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("fill of {requested} exceeds remaining quantity {remaining}")]
    Overfill { requested: u64, remaining: u64 },

    #[error("fill quantity must be positive")]
    ZeroFill,

    #[error("order is {status:?} and can no longer fill")]
    Terminal { status: OrderStatus },

    #[error("order symbol {order} does not match book symbol {book}")]
    SymbolMismatch { order: String, book: String },
}

/// A submitted order that fails validation.
///
/// Counted as failed and reported; the engine never sees it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("quantity must be a positive integer")]
    InvalidQuantity,

    #[error("price must be positive")]
    InvalidPrice,

    #[error("trader id must not be empty")]
    EmptyTraderId,

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("unknown side: {0}")]
    UnknownSide(String),
}
