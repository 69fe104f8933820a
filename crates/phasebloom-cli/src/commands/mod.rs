//! CLI command handlers.

pub mod diagnose;
pub mod run;
