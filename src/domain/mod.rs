//! Exchange-agnostic domain types.
//!
//! Nothing in here performs I/O. State machines are expressed as pure
//! functions over enums and are driven by the application layer.

pub mod account;
pub mod error;
pub mod id;
pub mod negotiation;
pub mod payment;
pub mod receipt;
pub mod stats;
pub mod transaction;

pub use account::{Account, AccountStatus, AccountUsage, Credentials, ExchangeKind};
pub use id::{AccountId, AdId, ExternalId, OrderId, TransactionId};
pub use negotiation::{
    ChatEntry, Direction, Intent, NegotiationSession, NegotiationState, RejectionReason, Step,
};
pub use payment::{PaymentContact, PaymentDetails, PaymentMethod};
pub use receipt::{MatchOutcome, NoMatchReason, Receipt};
pub use stats::{AccountKindStats, AccountStats, SessionStats, TransactionStats};
pub use transaction::{
    BuyerReputation, ReceiptRecord, ReceiptValidation, Transaction, TransactionDraft,
    TransactionStatus,
};
