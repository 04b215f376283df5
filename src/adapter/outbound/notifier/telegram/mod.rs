//! Telegram notification and command handling.
//!
//! Pushes lifecycle events to the operator chat and serves the admin bot
//! commands that drive the engine through the admin port.

mod auth;
mod command;
mod format;

pub mod control;
pub mod notifier;
