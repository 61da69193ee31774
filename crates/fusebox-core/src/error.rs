//! Error types for Fusebox configuration and settings loading
//!
//! Errors produced by wrapped operations never pass through this type; the
//! breaker hands them back to the caller untouched.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for Fusebox operations
pub type FuseboxResult<T> = Result<T, FuseboxError>;

/// Main error type for Fusebox
#[derive(Error, Debug, Clone)]
pub enum FuseboxError {
    /// Invalid breaker or registry configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Settings file could not be read
    #[error("IO error reading '{}': {message}", .path.display())]
    Io { message: String, path: PathBuf },

    /// Settings content could not be deserialized
    #[error("Failed to parse {format} settings: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

impl FuseboxError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an IO error for a settings path
    pub fn io(error: &std::io::Error, path: &Path) -> Self {
        Self::Io {
            message: error.to_string(),
            path: path.to_path_buf(),
        }
    }

    /// Create a parse error for the given format
    pub fn parse(format: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            format,
            message: message.to_string(),
        }
    }

    /// Attach context to a configuration error; other variants pass through
    pub fn in_context(self, context: impl Into<String>) -> Self {
        match self {
            Self::Config { message, .. } => Self::Config {
                message,
                context: Some(context.into()),
            },
            other => other,
        }
    }

    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "FUSEBOX_CONFIG",
            Self::Io { .. } => "FUSEBOX_IO",
            Self::Parse { .. } => "FUSEBOX_PARSE",
        }
    }

    /// Additional context attached to the error, if any
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. } => context.as_deref(),
            _ => None,
        }
    }
}
