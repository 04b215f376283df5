//! Cross-cutting wrappers around exchange connectors.
//!
//! Live connectors are external collaborators. Whatever implements
//! [`crate::port::ExchangeConnector`] is wrapped here with a per-account
//! request budget before the engine sees it.

mod limited;
mod limiter;

pub use limited::RateLimitedConnector;
pub use limiter::RateLimiter;
