//! Inbound adapters (driving side).
//!
//! - [`cli`]: the `dealflow` command line
//! - [`receipt`]: receipt sources feeding the matcher

pub mod cli;
pub mod receipt;
