//! In-memory storage backend
//!
//! Simple storage for tests and throwaway registries.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use zonereg_core::{RegistryError, Result};

use super::StateStore;
use crate::inventory::Snapshot;

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: RwLock<Option<Snapshot>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `snapshot`
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
            read_only: AtomicBool::new(false),
        }
    }

    /// Make every following save fail with a storage error.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// The last saved snapshot
    pub async fn current(&self) -> Option<Snapshot> {
        self.snapshot.read().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(RegistryError::Storage("memory store is read-only".into()));
        }
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        assert!(tokio_test::block_on(store.load()).unwrap().is_none());

        tokio_test::block_on(store.save(&Snapshot::default())).unwrap();
        assert_eq!(
            tokio_test::block_on(store.load()).unwrap(),
            Some(Snapshot::default())
        );
    }

    #[test]
    fn test_read_only_rejects_save() {
        let store = MemoryStore::with_snapshot(Snapshot::default());
        store.set_read_only(true);

        let err = tokio_test::block_on(store.save(&Snapshot::default())).unwrap_err();
        assert!(matches!(err, RegistryError::Storage(_)));
        assert!(tokio_test::block_on(store.current()).is_some());
    }
}
