//! CLI module graph.

pub mod check;
pub mod command;
pub mod config;
pub mod list;
pub mod operator;
pub mod output;
pub mod paths;
pub mod run;
pub mod stats;
