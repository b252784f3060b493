//! Durable function registry.
//!
//! The registry is a single JSON file holding the full `name -> metadata`
//! mapping. [`RegistryStore`] is the only authority over that file:
//!
//! - every write is read-modify-write of the whole map under one writer
//!   lock, so concurrent upserts for different names never drop each other
//! - the file is replaced atomically (temp file, fsync, rename), so a crash
//!   mid-write leaves either the old or the new registry on disk
//! - readers use an in-memory copy that is swapped only after the file has
//!   been replaced

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use fnhost_common::RuntimeError;

use crate::function::FunctionMetadata;

/// All registered functions, keyed by name.
pub type Registry = BTreeMap<String, FunctionMetadata>;

/// Single-writer store for the registry file.
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    cache: RwLock<Arc<Registry>>,
    writer: Mutex<()>,
}

impl RegistryStore {
    /// Open the registry at `path`, loading any existing entries.
    ///
    /// A missing file is an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Storage`] if the file exists but cannot be
    /// read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RuntimeError> {
        let path = path.into();
        let registry = load(&path).await?;

        info!(
            path = %path.display(),
            functions = registry.len(),
            "Registry loaded"
        );

        Ok(Self {
            path,
            cache: RwLock::new(Arc::new(registry)),
            writer: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the registry from disk, bypassing the in-memory copy.
    pub async fn load(&self) -> Result<Registry, RuntimeError> {
        load(&self.path).await
    }

    /// Snapshot of every entry.
    pub fn snapshot(&self) -> Arc<Registry> {
        self.cache.read().clone()
    }

    /// Look up one entry.
    pub fn get(&self, name: &str) -> Option<FunctionMetadata> {
        self.cache.read().get(name).cloned()
    }

    /// All entries, ordered by name.
    pub fn list(&self) -> Vec<FunctionMetadata> {
        self.cache.read().values().cloned().collect()
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace the entry for `metadata.name`.
    ///
    /// Other entries are preserved.
    #[instrument(skip(self, metadata), fields(function = %metadata.name))]
    pub async fn upsert(&self, metadata: FunctionMetadata) -> Result<(), RuntimeError> {
        let _writer = self.writer.lock().await;

        let mut next = Registry::clone(&self.snapshot());
        let replaced = next.insert(metadata.name.clone(), metadata).is_some();

        self.persist(next).await?;
        debug!(replaced, "Registry entry written");
        Ok(())
    }

    /// Replace the whole registry.
    ///
    /// Entries missing from `registry` are dropped.
    #[instrument(skip(self, registry), fields(functions = registry.len()))]
    pub async fn save(&self, registry: Registry) -> Result<(), RuntimeError> {
        let _writer = self.writer.lock().await;
        self.persist(registry).await
    }

    /// Write `registry` to disk, then publish it to readers.
    ///
    /// Callers must hold the writer lock.
    async fn persist(&self, registry: Registry) -> Result<(), RuntimeError> {
        let bytes = serde_json::to_vec_pretty(&registry)
            .map_err(|e| RuntimeError::storage(format!("failed to serialize registry: {e}")))?;

        write_atomic(&self.path, &bytes).await.map_err(|e| {
            RuntimeError::storage(format!(
                "failed to write registry '{}': {e}",
                self.path.display()
            ))
        })?;

        *self.cache.write() = Arc::new(registry);
        Ok(())
    }
}

async fn load(path: &Path) -> Result<Registry, RuntimeError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Registry::new()),
        Err(e) => {
            return Err(RuntimeError::storage(format!(
                "failed to read registry '{}': {e}",
                path.display()
            )));
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Registry::new());
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        RuntimeError::storage(format!(
            "registry '{}' is corrupt: {e}",
            path.display()
        ))
    })
}

/// Replace `path` with `bytes` via a synced temp file and a rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;

    // Make the rename itself durable.
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = tokio::fs::File::open(parent).await {
            if let Err(e) = dir.sync_all().await {
                warn!(path = %parent.display(), error = %e, "Failed to sync registry directory");
            }
        }
    }

    Ok(())
}
