//! Subcommand implementations.

pub mod breakpoints;
pub mod config_cmd;
pub mod log;
pub mod run;
pub mod tools;
