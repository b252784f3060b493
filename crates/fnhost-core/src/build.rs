//! Source-to-artifact build pipeline.
//!
//! [`BuildPipeline`] runs the configured toolchain once per registration.
//! The toolchain writes to a staging file next to the final artifact; only a
//! successful build renames the staging file over the artifact, so a broken
//! rebuild never replaces a working binary.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use fnhost_common::{BuildConfig, Operation, PathsConfig, RuntimeError};

use crate::process::{ProcessError, run_captured};

const SOURCE_PLACEHOLDER: &str = "{source}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Builds function sources into executables.
///
/// The pipeline is the only writer of files in the artifact directory.
#[derive(Debug, Clone)]
pub struct BuildPipeline {
    config: BuildConfig,
    paths: PathsConfig,
}

impl BuildPipeline {
    /// Create a pipeline for the given toolchain and layout.
    pub fn new(config: BuildConfig, paths: PathsConfig) -> Self {
        Self { config, paths }
    }

    /// Get the build configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Where the source for `name` is stored.
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.paths.source_path(name, &self.config.source_extension)
    }

    /// Where the artifact for `name` ends up.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.paths.artifact_path(name)
    }

    /// Build `source_path` into the artifact for `name`.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Build`] if the toolchain cannot start or exits
    ///   nonzero; the combined output is attached verbatim
    /// - [`RuntimeError::Timeout`] if the build exceeds its bound
    /// - [`RuntimeError::Io`] if the artifact cannot be moved into place
    #[instrument(skip(self, source_path), fields(source = %source_path.display()))]
    pub async fn build(&self, name: &str, source_path: &Path) -> Result<PathBuf, RuntimeError> {
        let artifact = self.artifact_path(name);
        tokio::fs::create_dir_all(&self.paths.artifact_dir).await?;

        let staging = self
            .paths
            .artifact_dir
            .join(format!(".{name}.build-{}", Uuid::new_v4().simple()));

        let command = self.command(source_path, &staging);
        debug!(program = %self.config.program, "Invoking toolchain");

        let result = run_captured(command, self.config.timeout()).await;

        let captured = match result {
            Ok(captured) => captured,
            Err(e) => {
                remove_staging(&staging).await;
                return Err(match e {
                    ProcessError::Spawn(e) => RuntimeError::build(
                        name,
                        format!("failed to start toolchain '{}': {e}", self.config.program),
                    ),
                    ProcessError::Wait(e) => RuntimeError::Io(e),
                    ProcessError::TimedOut { .. } => {
                        RuntimeError::timeout(Operation::Build, name, self.config.timeout_ms)
                    }
                });
            }
        };

        if !captured.success() {
            remove_staging(&staging).await;
            warn!(
                function = %name,
                status = %captured.describe_status(),
                "Build failed"
            );
            return Err(RuntimeError::build(name, captured.output_lossy()));
        }

        if tokio::fs::metadata(&staging).await.is_err() {
            return Err(RuntimeError::build(
                name,
                format!(
                    "toolchain succeeded but produced no artifact\n{}",
                    captured.output_lossy()
                ),
            ));
        }

        tokio::fs::rename(&staging, &artifact).await?;

        info!(
            function = %name,
            artifact = %artifact.display(),
            duration_ms = captured.duration.as_millis(),
            "Build succeeded"
        );

        Ok(artifact)
    }

    /// Toolchain command with placeholders substituted.
    fn command(&self, source: &Path, output: &Path) -> Command {
        let source = source.to_string_lossy();
        let output = output.to_string_lossy();

        let mut command = Command::new(&self.config.program);
        for arg in &self.config.args {
            command.arg(
                arg.replace(SOURCE_PLACEHOLDER, &source)
                    .replace(OUTPUT_PLACEHOLDER, &output),
            );
        }
        command
    }
}

async fn remove_staging(staging: &Path) {
    if let Err(e) = tokio::fs::remove_file(staging).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %staging.display(), error = %e, "Failed to remove staging artifact");
        }
    }
}
