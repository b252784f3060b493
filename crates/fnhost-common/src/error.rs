//! Error types for fnhost.
//!
//! [`RuntimeError`] is the single taxonomy shared by every stage of a
//! function's lifecycle:
//! - validation of the submitted definition
//! - building the artifact
//! - persisting registry state
//! - executing the artifact
//!
//! Build and execution failures carry the captured process output verbatim
//! so callers can surface toolchain diagnostics.

use std::io;

use thiserror::Error;

/// Top-level runtime errors.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The submitted input was missing or malformed.
    #[error("Validation failed: {reason}")]
    Validation {
        /// Description of what was rejected.
        reason: String,
    },

    /// The toolchain exited unsuccessfully.
    #[error("Build failed for '{name}': {output}")]
    Build {
        /// Function being built.
        name: String,
        /// Combined toolchain output.
        output: String,
    },

    /// Reading or writing the registry failed.
    #[error("Storage error: {reason}")]
    Storage {
        /// Description of the storage failure.
        reason: String,
    },

    /// The function artifact could not be spawned or exited unsuccessfully.
    #[error("Execution of '{name}' failed: {reason}")]
    Execution {
        /// Function being executed.
        name: String,
        /// Exit status or spawn error.
        reason: String,
        /// Combined output captured before the failure.
        output: String,
    },

    /// A build or execution exceeded its time bound.
    #[error("{operation} of '{name}' timed out after {duration_ms}ms")]
    Timeout {
        /// Which stage timed out.
        operation: Operation,
        /// Function involved.
        name: String,
        /// The configured bound in milliseconds.
        duration_ms: u64,
    },

    /// No function with this name is registered.
    #[error("Function not found: {name}")]
    FunctionNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

/// Lifecycle stage that spawned a subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Toolchain invocation.
    Build,
    /// Artifact invocation.
    Execution,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Build => write!(f, "Build"),
            Operation::Execution => write!(f, "Execution"),
        }
    }
}

impl RuntimeError {
    /// Create a new `Validation` error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Create a new `Build` error.
    pub fn build(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Build {
            name: name.into(),
            output: output.into(),
        }
    }

    /// Create a new `Storage` error.
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// Create a new `Execution` error.
    pub fn execution(
        name: impl Into<String>,
        reason: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::Execution {
            name: name.into(),
            reason: reason.into(),
            output: output.into(),
        }
    }

    /// Create a new `Timeout` error.
    pub fn timeout(operation: Operation, name: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation,
            name: name.into(),
            duration_ms,
        }
    }

    /// Create a new `FunctionNotFound` error.
    pub fn function_not_found(name: impl Into<String>) -> Self {
        Self::FunctionNotFound { name: name.into() }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Short machine-readable label for the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Build { .. } => "build",
            Self::Storage { .. } => "storage",
            Self::Execution { .. } => "execution",
            Self::Timeout { .. } => "timeout",
            Self::FunctionNotFound { .. } => "not_found",
            Self::Io(_) | Self::InvalidConfig { .. } => "internal",
        }
    }

    /// Returns `true` if the caller supplied bad input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns `true` if this error indicates the function was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FunctionNotFound { .. })
    }

    /// Returns `true` if a subprocess exceeded its time bound.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
