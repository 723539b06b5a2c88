//! Command implementations.

pub mod config;
pub mod dhcp;
pub mod history;
pub mod host;
pub mod network;
pub mod record;
pub mod zone;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use zonereg::{Applied, FileStore, Registry, RegistryConfig, SystemClock};

use crate::output::{self, OutputFormat};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output format
    pub output_format: OutputFormat,

    /// Engine settings
    pub registry_config: RegistryConfig,

    /// JSON state file
    pub state_path: PathBuf,
}

impl Context {
    /// Open the registry backed by the state file.
    pub async fn registry(&self) -> Result<Registry> {
        let store = Arc::new(FileStore::new(&self.state_path));
        let registry =
            Registry::open(self.registry_config.clone(), store, Arc::new(SystemClock)).await?;
        Ok(registry)
    }
}

/// Print the outcome of a mutation and the zones now waiting for a new serial.
pub async fn report<T: Serialize>(
    ctx: &Context,
    registry: &Registry,
    applied: Applied<T>,
    message: impl FnOnce(&T) -> String,
) -> Result<()> {
    let zones: Vec<String> = registry
        .read(|inv| {
            applied
                .affected
                .iter()
                .filter_map(|id| inv.zone_by_id(id).map(|z| z.name.clone()))
                .collect()
        })
        .await;

    output::print(ctx.output_format, &applied.value, |value| {
        output::success(message(value));
        if !zones.is_empty() {
            println!("  {} {}", "Dirty zones:".bold(), zones.join(", ").yellow());
        }
    })
}
