//! Configuration module
//!
//! Handles loading of timer configuration files. Command-line flags and
//! environment variables are layered on top by the CLI.

pub mod loader;
pub mod schema;

pub use loader::{ConfigLoader, LoaderOptions};
pub use schema::*;
