//! SQLite persistence adapter.
//!
//! Implements every store port on one database using Diesel ORM.

pub mod database;
pub mod store;

pub use store::SqliteStore;
