//! Inbound (driving) ports consumed by inbound adapters.
//!
//! - [`admin`]: operator queries and overrides (Telegram bot, CLI)

pub mod admin;
