//! Error types for shopcore.
//!
//! The taxonomy follows the layers of the system:
//!
//! - [`StoreError`]: persistence failures. Logged, surfaced as a generic
//!   server error, safe for the caller to retry.
//! - [`CheckoutError`]: order placement failures. The first three variants
//!   are user-correctable client errors and are never retried automatically.
//! - [`QueryError`]: listing parameter validation failures, rejected before
//!   any query is built or executed.
//!
//! Every checkout abort is side-effect free: the enclosing transaction rolls
//! back, so no compensating cleanup is ever needed.

use thiserror::Error;

use crate::model::UnknownCategory;
use crate::types::{ProductId, UserId};

/// Errors from the persistence layer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Could not reach the backing store at all.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A query or transaction failed while executing `operation`.
    #[error("storage failure during {operation}: {detail}")]
    Failure {
        /// The logical operation that was executing.
        operation: &'static str,
        /// Backend-reported detail.
        detail: String,
    },

    /// A stored row could not be decoded into a valid domain value.
    ///
    /// This covers unknown category strings, negative stock, and similar
    /// corruption. Decoding never silently defaults.
    #[error("malformed row: {detail}")]
    Decode {
        /// What was wrong with the row.
        detail: String,
    },
}

/// Errors from the order placement transaction.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    /// The buyer does not exist. Detected before any lock is taken.
    #[error("user {0} does not exist")]
    UserNotFound(UserId),

    /// A requested product does not exist; the whole order is aborted and
    /// no partial order is created.
    #[error("product {0} does not exist")]
    ProductNotFound(ProductId),

    /// A requested product has fewer units on hand than requested.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        /// The product that could not be supplied.
        product_id: ProductId,
        /// Units the buyer asked for.
        requested: u32,
        /// Units actually on hand under the lock.
        available: u32,
    },

    /// A line amount or the order total overflowed i64.
    #[error("amount overflow while pricing product {0}")]
    AmountOverflow(ProductId),

    /// The persistence layer failed mid-checkout.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from listing query parameter validation.
///
/// All of these are raised while parsing caller input into typed query
/// params, before any SQL exists; a sort column that is not on the
/// allow-list can therefore never reach a query string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The requested sort column is not sortable.
    #[error("unknown sort column: {0}")]
    UnknownSortColumn(String),

    /// The requested sort direction is neither `asc` nor `desc`.
    #[error("unknown sort direction: {0}")]
    UnknownSortDirection(String),

    /// The requested category is not in the closed set.
    #[error("unknown product category: {0}")]
    UnknownCategory(String),

    /// The requested limit exceeds the maximum page size.
    #[error("limit out of range: {0} (maximum 1000)")]
    LimitOutOfRange(u32),

    /// The search filter was present but blank.
    #[error("search text must not be empty")]
    EmptySearch,
}

impl From<UnknownCategory> for QueryError {
    fn from(err: UnknownCategory) -> Self {
        Self::UnknownCategory(err.0)
    }
}

/// Type alias for persistence results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for checkout results.
pub type CheckoutResult<T> = Result<T, CheckoutError>;
