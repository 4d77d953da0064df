//! Error types for ledger operations.

use crate::Amount;
use thiserror::Error;

/// Main error type for ledger operations.
///
/// `AccountNotFound` is deliberately absent: unknown accounts behave as
/// zero-balance accounts on every code path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount was zero or negative.
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: Amount },

    /// Authorization failed the solvency check.
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Amount,
        available: Amount,
    },

    /// Commit or release of a hold that does not exist, was already
    /// resolved, or expired. A retried commit may legitimately observe
    /// this after the first attempt succeeded; callers must treat it as
    /// ambiguous and reconcile via a balance query.
    #[error("Unknown hold: {0}")]
    UnknownHold(String),

    /// The engine is shutting down; the account gate was not acquired.
    #[error("Ledger unavailable: shutting down")]
    Unavailable,
}

impl LedgerError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable)
    }

    /// Get a stable error code for wire responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount { .. } => "INVALID_AMOUNT",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::UnknownHold { .. } => "UNKNOWN_HOLD",
            LedgerError::Unavailable => "UNAVAILABLE",
        }
    }
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
