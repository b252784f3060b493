//! Shared application state.
//!
//! This module provides [`AppState`], which holds the registry, the
//! registration service, the executor and the trigger orchestrator shared by
//! every request handler. Nothing here is global; each server instance owns
//! its own state.

use std::sync::Arc;

use fnhost_common::{RuntimeConfig, RuntimeError};
use fnhost_core::{
    BuildPipeline, Executor, FunctionDefinition, FunctionMetadata, RegistrationService,
    RegistryStore,
};
use fnhost_trigger::{Binding, TriggerOrchestrator};
use tracing::info;

/// Shared state across all request handlers.
///
/// This struct is cloned for each request, so it uses `Arc` for shared data.
#[derive(Clone)]
pub struct AppState {
    /// Durable function registry.
    registry: Arc<RegistryStore>,

    /// Validate → build → persist.
    registrar: Arc<RegistrationService>,

    /// Runs artifacts.
    executor: Arc<Executor>,

    /// Live route and schedule bindings.
    orchestrator: Arc<TriggerOrchestrator>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Opens the registry and, if `config.restore_bindings` is set, re-binds
    /// every registered function. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be opened.
    pub async fn new(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let registry = Arc::new(RegistryStore::open(&config.paths.registry_file).await?);
        let executor = Arc::new(Executor::new(registry.clone(), config.execution.clone()));
        let registrar = Arc::new(RegistrationService::new(
            BuildPipeline::new(config.build.clone(), config.paths.clone()),
            registry.clone(),
        ));
        let orchestrator = Arc::new(TriggerOrchestrator::new(executor.clone()));

        let state = Self {
            registry,
            registrar,
            executor,
            orchestrator,
        };

        if config.restore_bindings {
            state.restore_bindings();
        }

        Ok(state)
    }

    /// Get the registry.
    pub fn registry(&self) -> &RegistryStore {
        &self.registry
    }

    /// Get the executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Get the trigger orchestrator.
    pub fn orchestrator(&self) -> &TriggerOrchestrator {
        &self.orchestrator
    }

    /// Register a function and bind its trigger.
    ///
    /// The bind happens while the registration still holds its per-name
    /// lock.
    ///
    /// # Errors
    ///
    /// Any registration error; nothing is bound in that case.
    pub async fn register(
        &self,
        definition: FunctionDefinition,
    ) -> Result<(FunctionMetadata, Binding), RuntimeError> {
        let registration = self.registrar.register(definition).await?;
        let binding = self
            .orchestrator
            .bind(registration.name.as_str(), &registration.trigger)?;
        Ok((registration.metadata.clone(), binding))
    }

    /// Re-bind every registry entry. Returns the number bound.
    pub fn restore_bindings(&self) -> usize {
        let entries = self.registry.list();
        let bound = self.orchestrator.restore(&entries);
        info!(registered = entries.len(), bound, "Registry bindings restored");
        bound
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("functions", &self.registry.len())
            .field("routes", &self.orchestrator.routes().len())
            .field("scheduled", &self.orchestrator.scheduler().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnhost_core::Trigger;
    use tempfile::TempDir;

    use crate::testing::{script, test_config};

    #[tokio::test]
    async fn test_app_state_creation() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(&test_config(&dir)).await.unwrap();

        assert!(state.registry().is_empty());
        assert!(state.orchestrator().routes().is_empty());
    }

    #[tokio::test]
    async fn test_register_binds_trigger() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(&test_config(&dir)).await.unwrap();

        let (metadata, binding) = state
            .register(FunctionDefinition::new("echo", "http", script("echo hi")))
            .await
            .unwrap();

        assert_eq!(metadata.name, "echo");
        assert_eq!(
            binding,
            Binding::Http {
                route: "/echo".into()
            }
        );
        let invocation = state.orchestrator().invoke_route("/echo").await.unwrap();
        assert_eq!(invocation.output, b"hi\n");
    }

    #[tokio::test]
    async fn test_failed_registration_leaves_bindings() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(&test_config(&dir)).await.unwrap();
        state
            .register(FunctionDefinition::new("keep", "http", script("echo v1")))
            .await
            .unwrap();

        let err = state
            .register(FunctionDefinition::new("keep", "nonsense", script("echo v2")))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(state.orchestrator().binding("keep").is_bound());
        assert_eq!(state.registry().get("keep").unwrap().trigger, "http");
    }

    #[tokio::test]
    async fn test_build_failure_keeps_previous_binding() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(&test_config(&dir)).await.unwrap();
        state
            .register(FunctionDefinition::new("keep", "http", script("echo v1")))
            .await
            .unwrap();

        let err = state
            .register(FunctionDefinition::new("keep", "*/5 * * * *", script("BROKEN")))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "build");
        assert_eq!(
            state.orchestrator().binding("keep"),
            Binding::Http {
                route: "/keep".into()
            }
        );
        assert!(!state.orchestrator().scheduler().is_scheduled("keep"));
        assert!(state.orchestrator().scheduler().is_empty());
        assert_eq!(state.registry().get("keep").unwrap().trigger, "http");

        let invocation = state.orchestrator().invoke_route("/keep").await.unwrap();
        assert_eq!(invocation.output, b"v1\n");
    }

    #[tokio::test]
    async fn test_restore_on_startup() {
        let dir = TempDir::new().unwrap();
        {
            let state = AppState::new(&test_config(&dir)).await.unwrap();
            state
                .register(FunctionDefinition::new("web", "http", script("echo web")))
                .await
                .unwrap();
            state
                .register(FunctionDefinition::new("tick", "*/5 * * * *", script("echo tick")))
                .await
                .unwrap();
        }

        let restarted = AppState::new(&test_config(&dir)).await.unwrap();
        assert!(restarted.orchestrator().routes().contains("/web"));
        assert!(restarted.orchestrator().scheduler().is_scheduled("tick"));
        assert!(matches!(
            Trigger::parse(&restarted.registry().get("tick").unwrap().trigger).unwrap(),
            Trigger::Schedule(_)
        ));
    }

    #[tokio::test]
    async fn test_restore_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        {
            let state = AppState::new(&test_config(&dir)).await.unwrap();
            state
                .register(FunctionDefinition::new("web", "http", script("echo web")))
                .await
                .unwrap();
        }

        let mut config = test_config(&dir);
        config.restore_bindings = false;
        let restarted = AppState::new(&config).await.unwrap();

        assert_eq!(restarted.registry().len(), 1);
        assert!(restarted.orchestrator().routes().is_empty());
    }
}
