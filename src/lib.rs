//! Dealflow - P2P fiat/crypto transaction orchestration.
//!
//! The engine picks up buy requests from a source exchange, republishes
//! them as advertisements on a second exchange, negotiates payment with
//! the counterparty over chat, matches incoming bank receipts and
//! releases the crypto once payment is confirmed.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Transactions, accounts, negotiation sessions and receipts.
//!   Pure state machines with no I/O.
//! - [`port`] - Traits the application depends on: exchanges, stores,
//!   receipt sources, notifiers and the admin surface.
//! - [`application`] - Use cases: the transaction lifecycle, account
//!   maintenance, negotiation, receipt matching and the worker pool.
//! - [`adapter`] - Port implementations: SQLite and in-memory stores,
//!   the paper exchange, the Telegram bot, the CLI and receipt intake.
//! - [`infrastructure`] - Configuration, wiring and the periodic loops.
//!
//! # Features
//!
//! - `telegram` - Telegram notifications and admin commands (default)
//! - `testkit` - Builders and fakes shared by the integration tests
//!
//! # Example
//!
//! ```no_run
//! use dealflow::infrastructure::config::settings::Config;
//!
//! let config = Config::load("config.toml").unwrap();
//! println!("{} accounts configured", config.accounts.len());
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
