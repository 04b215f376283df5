//! Domain invariant violations.
//!
//! These errors come from the pure types in [`crate::domain`] and never
//! involve I/O. The lifecycle service wraps them into [`crate::error::Error`].
//!
//! # Examples
//!
//! ```
//! use dealflow::domain::error::DomainError;
//! use dealflow::domain::transaction::TransactionStatus;
//!
//! let err = DomainError::InvalidTransition {
//!     from: TransactionStatus::Pending,
//!     to: TransactionStatus::Approved,
//! };
//! assert_eq!(err.to_string(), "invalid transition PENDING -> APPROVED");
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use super::negotiation::NegotiationState;
use super::transaction::TransactionStatus;

/// Errors raised when a domain rule would be broken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The requested status change is not in the transition table.
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: TransactionStatus,
        /// Requested status.
        to: TransactionStatus,
    },

    /// Terminal transactions accept no further transitions.
    #[error("transaction is in terminal state {status}")]
    TerminalState {
        /// The terminal status the transaction is in.
        status: TransactionStatus,
    },

    /// Transaction amounts must be strictly positive.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    #[error("unknown exchange kind `{0}`")]
    UnknownExchangeKind(String),

    #[error("unknown transaction status `{0}`")]
    UnknownStatus(String),

    #[error("unknown negotiation state `{0}`")]
    UnknownNegotiationState(String),

    /// The negotiation already finished and accepts no more input.
    #[error("negotiation session is closed in state {state}")]
    SessionClosed {
        /// The terminal state of the session.
        state: NegotiationState,
    },
}
