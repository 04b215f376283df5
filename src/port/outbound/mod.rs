//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the engine's external dependencies: exchanges,
//! storage, receipt extraction and notifications.

pub mod exchange;
pub mod notifier;
pub mod receipt;
pub mod store;
