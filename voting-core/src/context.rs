//! Explicit dependency carrier: a `CoreContext` value carries the
//! storage handle and configuration, threaded through every entry
//! point instead of relying on global state. The CSPRNG is *not* a
//! `CoreContext` field — every cryptographic operation in this
//! workspace takes it as an explicit `&mut Csprng` parameter instead,
//! so no component — including this one — holds hidden mutable RNG
//! state.

use crate::config::{StorageBackend, VotingCoreConfig};
use std::sync::Arc;
use voting_storage::{FileStore, MemoryStore, Store, StoreError};

/// Everything a workflow function needs besides its own arguments and an
/// explicit `&mut Csprng`: the storage handle and configuration.
#[derive(Clone)]
pub struct CoreContext {
    pub store: Arc<dyn Store>,
    pub config: VotingCoreConfig,
}

impl CoreContext {
    /// Builds the storage backend named by `config.storage_backend` and
    /// wraps it with the rest of the configuration.
    pub fn new(config: VotingCoreConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn Store> = match &config.storage_backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File { base_dir } => Arc::new(FileStore::new(base_dir)?),
        };
        Ok(Self { store, config })
    }

    /// Builds a context around an already-constructed store, bypassing
    /// `config.storage_backend` — useful when the host wants to share one
    /// store across contexts or inject a test double.
    pub fn with_store(store: Arc<dyn Store>, config: VotingCoreConfig) -> Self {
        Self { store, config }
    }
}
