//! Configuration structures for fnhost.
//!
//! This module defines configuration options for various components:
//! - [`RuntimeConfig`]: Top-level configuration containing all settings
//! - [`PathsConfig`]: Where sources, artifacts and the registry live
//! - [`BuildConfig`]: Toolchain command and build time bound
//! - [`ExecutionConfig`]: Per-invocation limits and child environment

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
///
/// This structure contains all configuration options for the runtime.
/// It can be loaded from files (TOML, JSON) or built in code.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Filesystem layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Build pipeline configuration.
    #[serde(default)]
    pub build: BuildConfig,

    /// Execution engine configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Re-bind triggers for every registry entry at startup.
    #[serde(default = "defaults::restore_bindings")]
    pub restore_bindings: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            build: BuildConfig::default(),
            execution: ExecutionConfig::default(),
            restore_bindings: defaults::restore_bindings(),
        }
    }
}

impl RuntimeConfig {
    /// Root every relative path under `base`.
    ///
    /// Mostly useful in tests that run each instance in its own temp dir.
    pub fn rooted_at(mut self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        self.paths.source_dir = base.join(&self.paths.source_dir);
        self.paths.artifact_dir = base.join(&self.paths.artifact_dir);
        self.paths.registry_file = base.join(&self.paths.registry_file);
        self
    }
}

/// Filesystem layout for sources, artifacts and the registry file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory that receives one source file per function.
    #[serde(default = "defaults::source_dir")]
    pub source_dir: PathBuf,

    /// Directory that receives one executable artifact per function.
    #[serde(default = "defaults::artifact_dir")]
    pub artifact_dir: PathBuf,

    /// JSON file holding the full name -> metadata mapping.
    #[serde(default = "defaults::registry_file")]
    pub registry_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: defaults::source_dir(),
            artifact_dir: defaults::artifact_dir(),
            registry_file: defaults::registry_file(),
        }
    }
}

impl PathsConfig {
    /// Source file location for a function.
    pub fn source_path(&self, name: &str, extension: &str) -> PathBuf {
        self.source_dir.join(format!("{name}.{extension}"))
    }

    /// Artifact location for a function.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.artifact_dir.join(name)
    }
}

/// Toolchain configuration for the build pipeline.
///
/// `args` may contain the placeholders `{source}` and `{output}`, which are
/// replaced with the source file and the staging artifact path.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Toolchain executable.
    #[serde(default = "defaults::build_program")]
    pub program: String,

    /// Toolchain arguments.
    #[serde(default = "defaults::build_args")]
    pub args: Vec<String>,

    /// Extension given to stored source files.
    #[serde(default = "defaults::source_extension")]
    pub source_extension: String,

    /// Hard limit on a single build, in milliseconds.
    #[serde(default = "defaults::build_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: defaults::build_program(),
            args: defaults::build_args(),
            source_extension: defaults::source_extension(),
            timeout_ms: defaults::build_timeout_ms(),
        }
    }
}

impl BuildConfig {
    /// Get the build timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Per-invocation execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Execution timeout in milliseconds.
    #[serde(default = "defaults::execution_timeout_ms")]
    pub timeout_ms: u64,

    /// Working directory for the child process.
    ///
    /// Inherits the runtime's working directory when unset.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Start the child with an empty environment.
    #[serde(default)]
    pub clear_env: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::execution_timeout_ms(),
            working_dir: None,
            clear_env: false,
        }
    }
}

impl ExecutionConfig {
    /// Get the timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Default value functions for serde.
mod defaults {
    use std::path::PathBuf;

    pub const fn restore_bindings() -> bool {
        true
    }

    pub fn source_dir() -> PathBuf {
        PathBuf::from("user_functions")
    }

    pub fn artifact_dir() -> PathBuf {
        PathBuf::from("plugins")
    }

    pub fn registry_file() -> PathBuf {
        PathBuf::from("registry/registry.json")
    }

    pub fn build_program() -> String {
        "go".to_string()
    }

    pub fn build_args() -> Vec<String> {
        ["build", "-o", "{output}", "{source}"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn source_extension() -> String {
        "go".to_string()
    }

    pub const fn build_timeout_ms() -> u64 {
        120_000
    }

    pub const fn execution_timeout_ms() -> u64 {
        30_000
    }
}
