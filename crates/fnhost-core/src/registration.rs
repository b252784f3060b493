//! Function registration: validate, build, persist.
//!
//! A registration is all-or-nothing up to the registry write. Validation runs
//! before anything touches the filesystem; a failed build leaves the registry
//! untouched; only a successful build is persisted.
//!
//! Registrations of the same name are serialized by a per-name lock, and the
//! returned [`Registration`] keeps holding it. Callers bind the trigger while
//! the value is alive, so build, persist and bind for one name never
//! interleave with another registration of that name. Different names run
//! fully in parallel. A name's lock is forgotten once no registration holds
//! or awaits it, so the lock table only grows with concurrent activity.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

use fnhost_common::RuntimeError;

use crate::build::BuildPipeline;
use crate::function::{FunctionDefinition, FunctionMetadata, FunctionName};
use crate::registry::RegistryStore;
use crate::trigger::Trigger;

/// A successful registration.
///
/// Holds the per-name registration lock until dropped.
#[derive(Debug)]
pub struct Registration {
    /// Validated name.
    pub name: FunctionName,
    /// Parsed trigger, ready to bind.
    pub trigger: Trigger,
    /// The entry written to the registry.
    pub metadata: FunctionMetadata,
    _guard: NameGuard,
}

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Held per-name lock. Dropping it releases the lock and prunes the table
/// entry if nobody else references it.
#[derive(Debug)]
struct NameGuard {
    name: String,
    locks: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The table holds the only reference once every waiter is gone.
        self.locks
            .remove_if(&self.name, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Orchestrates validate → build → persist.
#[derive(Debug)]
pub struct RegistrationService {
    pipeline: BuildPipeline,
    registry: Arc<RegistryStore>,
    locks: Arc<LockTable>,
}

impl RegistrationService {
    /// Create a registration service.
    pub fn new(pipeline: BuildPipeline, registry: Arc<RegistryStore>) -> Self {
        Self {
            pipeline,
            registry,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Get the build pipeline.
    pub fn pipeline(&self) -> &BuildPipeline {
        &self.pipeline
    }

    /// Get the registry store.
    pub fn registry(&self) -> &Arc<RegistryStore> {
        &self.registry
    }

    /// Register (or re-register) a function.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Validation`] for a bad name, trigger or empty code;
    ///   nothing is written
    /// - [`RuntimeError::Build`] / [`RuntimeError::Timeout`] if the build
    ///   fails; the registry is unchanged
    /// - [`RuntimeError::Storage`] if the registry cannot be written; the new
    ///   artifact stays on disk
    #[instrument(skip(self, definition), fields(function = %definition.name))]
    pub async fn register(
        &self,
        definition: FunctionDefinition,
    ) -> Result<Registration, RuntimeError> {
        let name = FunctionName::parse(&definition.name)?;
        let trigger = Trigger::parse(&definition.trigger)?;
        if definition.code.is_empty() {
            return Err(RuntimeError::validation("function code must not be empty"));
        }

        let guard = self.lock(name.as_str()).await;

        let source = self.pipeline.source_path(name.as_str());
        if let Some(dir) = source.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&source, &definition.code).await?;

        let artifact = match self.pipeline.build(name.as_str(), &source).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(function = %name, error = %e, "Registration aborted: build failed");
                return Err(e);
            }
        };

        let metadata = FunctionMetadata::new(name.as_str(), trigger.to_string(), artifact);
        self.registry.upsert(metadata.clone()).await?;

        info!(
            function = %name,
            trigger = %trigger,
            artifact = %metadata.path.display(),
            "Function registered"
        );

        Ok(Registration {
            name,
            trigger,
            metadata,
            _guard: guard,
        })
    }

    async fn lock(&self, name: &str) -> NameGuard {
        let lock = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        NameGuard {
            name: name.to_string(),
            locks: self.locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }
}
