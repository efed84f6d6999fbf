//! `stoptimer` - countdown timer node for message pipelines
//!
//! This library provides the timer engine, its tokio host, configuration
//! loading, and the CLI used to drive a timer from a line-oriented stream.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod timer;
