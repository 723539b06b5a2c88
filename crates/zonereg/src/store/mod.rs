//! Snapshot persistence.
//!
//! - `FileStore` - pretty JSON on disk, replaced atomically on save
//! - `MemoryStore` - in-memory storage for tests

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use zonereg_core::Result;

use crate::inventory::Snapshot;

/// Storage backend for inventory snapshots.
///
/// The trait is object-safe and can be used as `Arc<dyn StateStore>`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last saved snapshot, or `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
