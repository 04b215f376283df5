//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for accounts, transactions and receipts.
//! - [`config`] - Canonical test configuration (memory store, no spool).
//! - [`notifier`] - A notifier that records every broadcast event.

pub mod config;
pub mod domain;
pub mod notifier;
