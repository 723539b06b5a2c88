//! Shared, persistent access to the inventory.

use std::sync::Arc;
use tokio::sync::RwLock;
use zonereg_core::Result;

use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::inventory::{Inventory, Snapshot};
use crate::store::StateStore;

/// The inventory behind a lock, saved to a [`StateStore`] after every
/// successful write.
///
/// Writers hold the exclusive lock from the first check until the snapshot
/// is saved, so dirty flags, serials and overlap checks are never raced.
pub struct Registry {
    state: RwLock<State>,
    store: Arc<dyn StateStore>,
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
}

/// The live inventory and the snapshot last written to the store.
struct State {
    inventory: Inventory,
    saved: Snapshot,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

impl Registry {
    /// Load the inventory from `store`, or start empty.
    pub async fn open(
        config: RegistryConfig,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let inventory = match store.load().await? {
            Some(snapshot) => Inventory::from_snapshot(config.clone(), clock.clone(), snapshot)?,
            None => {
                tracing::info!("starting with an empty inventory");
                Inventory::new(config.clone(), clock.clone())
            }
        };
        let saved = inventory.snapshot();
        Ok(Self {
            state: RwLock::new(State { inventory, saved }),
            store,
            config,
            clock,
        })
    }

    /// Run a query under the shared lock.
    pub async fn read<T>(&self, f: impl FnOnce(&Inventory) -> T) -> T {
        let guard = self.state.read().await;
        f(&guard.inventory)
    }

    /// Run a mutation under the exclusive lock and persist the result.
    ///
    /// If the mutation fails or the snapshot cannot be saved, the inventory
    /// is rebuilt from the last saved snapshot.
    pub async fn write<T>(&self, f: impl FnOnce(&mut Inventory) -> Result<T>) -> Result<T> {
        let mut guard = self.state.write().await;

        let err = match f(&mut guard.inventory) {
            Ok(value) => {
                let snapshot = guard.inventory.snapshot();
                match self.store.save(&snapshot).await {
                    Ok(()) => {
                        guard.saved = snapshot;
                        return Ok(value);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "saving inventory failed, change rolled back");
                        e
                    }
                }
            }
            Err(e) => e,
        };
        self.restore(&mut guard);
        Err(err)
    }

    fn restore(&self, state: &mut State) {
        let snapshot = state.saved.clone();
        match Inventory::from_snapshot(self.config.clone(), self.clock.clone(), snapshot) {
            Ok(inventory) => state.inventory = inventory,
            Err(e) => tracing::error!(error = %e, "cannot restore the last saved inventory"),
        }
    }

    /// Render a zone. A pending serial bump is persisted before the text is
    /// returned.
    pub async fn render(&self, zone: &str) -> Result<String> {
        self.write(|inv| inv.render_zone(zone)).await
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> Snapshot {
        self.read(Inventory::snapshot).await
    }
}
