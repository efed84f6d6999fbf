//! CLI module
//!
//! Argument parsing and command handlers for the `stoptimer` binary.

pub mod args;
pub mod commands;
