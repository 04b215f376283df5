//! Infrastructure layer.
//!
//! Provides technical concerns that support the application without containing
//! business logic. This layer handles configuration, connector wrapping
//! and runtime coordination.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Configuration loading and validation
//! - [`exchange`] - Rate limiting around exchange connectors
//! - [`orchestration`] - Periodic loops, health checks and shutdown
//! - [`retry`] - Backoff policy for transient connector failures

pub mod bootstrap;
pub mod config;
pub mod exchange;
pub mod orchestration;
pub mod retry;
