//! Outbound adapters (driven side).

pub mod memory;
pub mod notifier;
pub mod paper;
pub mod sqlite;
