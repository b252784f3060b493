//! Common types, errors, and configuration for fnhost.
//!
//! This crate provides shared functionality used across the fnhost workspace:
//! - Error types using `thiserror` for type-safe error handling
//! - Configuration structures for paths, builds and executions
//! - TOML configuration file loading

pub mod config;
pub mod config_file;
pub mod error;

pub use config::{BuildConfig, ExecutionConfig, PathsConfig, RuntimeConfig};
pub use config_file::{ConfigFile, ConfigFileError, ServerConfigFile};
pub use error::{Operation, RuntimeError};
