//! Function execution.
//!
//! [`Executor`] resolves a function's artifact through the registry (never by
//! recomputing the path, so it always runs what was actually built), spawns it
//! with no arguments and returns its combined output.
//!
//! Invocations of the same function are independent processes; there is no
//! concurrency cap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, instrument};
use uuid::Uuid;

use fnhost_common::{ExecutionConfig, Operation, RuntimeError};

use crate::process::{ProcessError, run_captured};
use crate::registry::RegistryStore;

/// Output of a successful invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Identifier used to correlate logs.
    pub id: Uuid,
    /// Combined stdout/stderr of the artifact.
    pub output: Vec<u8>,
    /// Wall-clock run time.
    pub duration: Duration,
}

impl Invocation {
    /// Create an invocation record with a fresh id.
    pub fn new(output: impl Into<Vec<u8>>, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            output: output.into(),
            duration,
        }
    }

    /// Output decoded lossily as UTF-8.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Anything that can run a registered function by name.
///
/// The route table and the scheduler depend on this seam rather than on
/// [`Executor`] directly.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Run `name` once.
    async fn invoke(&self, name: &str) -> Result<Invocation, RuntimeError>;
}

/// Runs function artifacts as child processes.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<RegistryStore>,
    config: ExecutionConfig,
}

impl Executor {
    /// Create an executor backed by `registry`.
    pub fn new(registry: Arc<RegistryStore>, config: ExecutionConfig) -> Self {
        Self { registry, config }
    }

    /// Get the execution configuration.
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    fn command(&self, artifact: &std::path::Path) -> Command {
        // Relative program paths are ambiguous once `current_dir` is set.
        let program = std::path::absolute(artifact).unwrap_or_else(|_| artifact.to_path_buf());
        let mut command = Command::new(program);
        if self.config.clear_env {
            command.env_clear();
        }
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait]
impl FunctionInvoker for Executor {
    /// # Errors
    ///
    /// - [`RuntimeError::FunctionNotFound`] if `name` is not in the registry
    /// - [`RuntimeError::Execution`] if the artifact cannot be spawned or
    ///   exits nonzero
    /// - [`RuntimeError::Timeout`] if it runs past the configured bound
    #[instrument(skip(self), fields(invocation_id = tracing::field::Empty))]
    async fn invoke(&self, name: &str) -> Result<Invocation, RuntimeError> {
        let metadata = self
            .registry
            .get(name)
            .ok_or_else(|| RuntimeError::function_not_found(name))?;

        let id = Uuid::new_v4();
        tracing::Span::current().record("invocation_id", tracing::field::display(id));

        info!(function = %name, artifact = %metadata.path.display(), "Executing function");

        let result = run_captured(self.command(&metadata.path), self.config.timeout()).await;
        let captured = match result {
            Ok(captured) => captured,
            Err(ProcessError::Spawn(e)) => {
                error!(function = %name, error = %e, "Failed to spawn artifact");
                return Err(RuntimeError::execution(
                    name,
                    format!("failed to spawn '{}': {e}", metadata.path.display()),
                    "",
                ));
            }
            Err(ProcessError::Wait(e)) => {
                return Err(RuntimeError::execution(name, e.to_string(), ""));
            }
            Err(ProcessError::TimedOut { output }) => {
                error!(
                    function = %name,
                    timeout_ms = self.config.timeout_ms,
                    output = %String::from_utf8_lossy(&output),
                    "Execution timed out"
                );
                return Err(RuntimeError::timeout(
                    Operation::Execution,
                    name,
                    self.config.timeout_ms,
                ));
            }
        };

        let output = captured.output_lossy();
        if !captured.success() {
            error!(
                function = %name,
                status = %captured.describe_status(),
                output = %output,
                "Execution failed"
            );
            return Err(RuntimeError::execution(name, captured.describe_status(), output));
        }

        info!(
            function = %name,
            duration_ms = captured.duration.as_millis(),
            output = %output,
            "Execution successful"
        );

        Ok(Invocation {
            id,
            output: captured.output,
            duration: captured.duration,
        })
    }
}
