//! Command-line interface module
//!
//! Provides argument parsing and command execution.

pub mod args;
pub mod commands;

pub use args::{Args, OnError, normalize_args, parse_args};
pub use commands::execute;
