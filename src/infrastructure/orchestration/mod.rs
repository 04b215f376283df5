//! Application orchestration.
//!
//! Runtime wiring, the periodic loops and lifecycle management.

mod context;
mod health;
pub mod loops;
mod runtime;

pub use context::Engine;
pub use health::{health_check, HealthCheck, HealthReport, HealthStatus};
pub use runtime::{run_with_shutdown, start, Orchestrator};
