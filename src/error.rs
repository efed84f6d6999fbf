//! Error types for `stoptimer`
//!
//! The timer engine itself never fails: malformed settings are normalized
//! when they are resolved. Errors only arise at the edges, while loading
//! configuration, talking to a running node, or doing I/O in the CLI host.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `stoptimer` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (unreadable or invalid YAML)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, broken pipe)
    pub const IO_ERROR: i32 = 3;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `stoptimer` operations.
#[derive(Debug, Error)]
pub enum StopTimerError {
    /// Configuration loading error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Timer node lifecycle error
    #[error(transparent)]
    Node(#[from] NodeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl StopTimerError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Node(_) | Self::Json(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("configuration file {path} is {size} bytes (limit: {limit})")]
    TooLarge {
        /// Path to the configuration file
        path: PathBuf,
        /// Actual size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },
}

// ============================================================================
// Node Errors
// ============================================================================

/// Errors raised by a running [`TimerNode`](crate::timer::TimerNode).
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node task has stopped and no longer accepts messages
    #[error("timer node is closed")]
    Closed,

    /// The node task panicked or was aborted
    #[error("timer node task failed: {0}")]
    Join(String),
}
