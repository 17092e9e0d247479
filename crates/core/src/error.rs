//! Costing error model.

use thiserror::Error;

use crate::id::ReceiptLineId;

/// Result type used across the costing engine.
pub type CostingResult<T> = Result<T, CostingError>;

/// Costing-domain error.
///
/// Keep this focused on deterministic business/domain failures plus the two
/// failure modes that cross the engine's boundary (external stock calls and
/// stale aggregate reads). Nothing here is retried internally; retry is the
/// caller's responsibility, made safe by the posting idempotency records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CostingError {
    /// A requested receipt, line or landed cost does not exist.
    #[error("not found")]
    NotFound,

    /// An operation was invoked against the wrong status or with missing
    /// data (e.g. posting a non-draft receipt, zero-cost lines, no lines).
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// A value failed validation (e.g. malformed currency code).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A ledger append was attempted with a zero quantity delta.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Landed cost allocation was requested for a receipt with no lines.
    #[error("no lines to allocate")]
    NoLinesToAllocate,

    /// A landed cost was allocated twice (allocation is write-once).
    #[error("landed cost already allocated")]
    AlreadyAllocated,

    /// A posted receipt already has a completed reversal.
    #[error("receipt already reversed")]
    AlreadyReversed,

    /// The external stock system call failed for one line. Prior lines'
    /// effects are retained; re-posting resumes at this line.
    #[error("external stock system failed for line {line_id}: {message}")]
    ExternalSystemFailure {
        line_id: ReceiptLineId,
        message: String,
    },

    /// A ledger append observed a stale aggregate read (optimistic
    /// concurrency check failed for the (tenant, item, location) key).
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),
}

impl CostingError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn concurrent(msg: impl Into<String>) -> Self {
        Self::ConcurrentModification(msg.into())
    }

    pub fn external(line_id: ReceiptLineId, message: impl Into<String>) -> Self {
        Self::ExternalSystemFailure {
            line_id,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// `true` for errors the caller must fix before retrying (nothing was
    /// attempted against the external system).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            CostingError::NotFound
                | CostingError::PreconditionFailed(_)
                | CostingError::Validation(_)
                | CostingError::InvalidQuantity(_)
                | CostingError::NoLinesToAllocate
                | CostingError::AlreadyAllocated
                | CostingError::AlreadyReversed
        )
    }
}
