//! Top-level error types for the CLI.
//!
//! Wraps argument, I/O and pipeline errors and maps them to process exit codes.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type surfaced by the binary
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pipeline errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Report could not be written
    #[error("Failed to write report to {path}: {reason}")]
    ReportFailed {
        /// Report destination
        path: String,
        /// Reason for the error
        reason: String,
    },
}

impl BundlerError {
    /// Process exit code for this error.
    ///
    /// A failed subprocess propagates its own status; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Bundler(e) => e.exit_code(),
            _ => 1,
        }
    }
}
