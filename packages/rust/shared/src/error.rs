//! Error types for specdocs.
//!
//! Library crates use [`SpecDocsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all specdocs operations.
#[derive(Debug, thiserror::Error)]
pub enum SpecDocsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Source specification is malformed or has an unrecognized shape.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The section plan violates an invariant (duplicate id, bad output path).
    #[error("plan error: {message}")]
    Plan { message: String },

    /// The planner collaborator failed to produce a section list.
    #[error("planner error: {0}")]
    Planner(String),

    /// A writer collaborator failed to produce a section body.
    #[error("writer error: {0}")]
    Writer(String),

    /// Network/HTTP error while fetching a remote spec.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Site rendering error.
    #[error("render error: {0}")]
    Render(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpecDocsError>;

impl SpecDocsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a plan error from any displayable message.
    pub fn plan(msg: impl Into<String>) -> Self {
        Self::Plan {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
