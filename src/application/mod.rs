//! Application services (use cases).
//!
//! These services drive the domain state machines and coordinate the
//! outbound ports. Nothing here knows which exchange, store or admin
//! channel is plugged in.

pub mod account;
pub mod admin;
pub mod lifecycle;
pub mod maintenance;
pub mod negotiation;
pub mod receipt;
pub mod worker;

pub use account::AccountRegistry;
pub use admin::AdminService;
pub use lifecycle::{IngestOutcome, LifecycleSettings, PurgeReport, TransactionLifecycle};
pub use maintenance::AccountMaintenance;
pub use negotiation::{NegotiationSettings, NegotiationStateMachine};
pub use receipt::{BankAliases, ReceiptMatcher};
pub use worker::WorkerPool;
