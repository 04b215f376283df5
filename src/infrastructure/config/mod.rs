//! Infrastructure configuration modules.

pub mod accounts;
pub mod database;
pub mod logging;
pub mod negotiation;
pub mod receipts;
pub mod schedule;
pub mod settings;
pub mod telegram;
pub mod trading;
pub mod workers;
