//! Error types for the bundler
//!
//! Provides structured error handling with context and proper error chains.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the bundler
#[derive(Error, Debug)]
pub enum BundlerError {
    /// Missing, unreadable or malformed config / package metadata
    #[error("Configuration error: {message} ({})", path.display())]
    Config {
        message: String,
        path: PathBuf,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A target failed the validation pass
    #[error("Validation error: target #{index}: {message}")]
    Validation { index: usize, message: String },

    /// Raised by the engine during the build or write phase
    #[error("Pipeline error: {message}")]
    Pipeline {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// File system operation errors
    #[error("File system error: {operation} failed on {}", path.display())]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Process execution errors
    #[error("Process error: {command} failed")]
    Process {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Watch registration errors
    #[error("Watch error: {message}")]
    Watch {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BundlerError {
    /// Create a new configuration error
    pub fn config<P: Into<PathBuf>>(message: impl Into<String>, path: P) -> Self {
        Self::Config {
            message: message.into(),
            path: path.into(),
            source: None,
        }
    }

    /// Create a configuration error wrapping its cause
    pub fn config_with_source<P, E>(message: impl Into<String>, path: P, source: E) -> Self
    where
        P: Into<PathBuf>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new validation error for the target at `index`
    pub fn validation(index: usize, message: impl Into<String>) -> Self {
        Self::Validation {
            index,
            message: message.into(),
        }
    }

    /// Create a new pipeline error
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new file system error
    pub fn file_system<P: Into<PathBuf>>(
        operation: impl Into<String>,
        path: P,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a new process error
    pub fn process(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Process {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a new watch error
    pub fn watch<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Watch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BundlerError>;
