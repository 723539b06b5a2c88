//! DNS zone inventory engine.
//!
//! zonereg keeps networks, hosts, their addresses and auxiliary records, and
//! the DNS zones they belong to. It derives everything a zone needs from that
//! inventory and renders deterministic BIND zone files with date-encoded
//! serials that only advance when a zone's rendered content changed.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zonereg::{MemoryStore, NewHost, NewZone, Registry, RegistryConfig, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> zonereg::Result<()> {
//!     let registry = Registry::open(
//!         RegistryConfig::default(),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(SystemClock),
//!     )
//!     .await?;
//!
//!     registry
//!         .write(|inv| {
//!             inv.create_zone(NewZone::new("example.org", ["ns1.example.org"], "hostmaster@example.org"))
//!         })
//!         .await?;
//!     registry
//!         .write(|inv| inv.create_host(NewHost::new("www.example.org", "ops@example.org")))
//!         .await?;
//!
//!     println!("{}", registry.render("example.org").await?);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`address`] - CIDR overlap and allocation arithmetic
//! - [`zones`] - zone names, host-to-zone resolution, dirty tracking
//! - [`inventory`] - the tables and every operation on them
//! - [`render`] - zone file output
//! - [`store`] - snapshot persistence
//! - [`registry`] - locking and persistence around the inventory

pub mod address;
pub mod clock;
pub mod config;
pub mod inventory;
pub mod registry;
pub mod render;
pub mod serial;
pub mod store;
pub mod zones;

// Re-export core types
pub use zonereg_core::*;

pub use address::{AddressSpace, Family};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::RegistryConfig;
pub use inventory::{Audited, HostRecord, Inventory, Snapshot};
pub use registry::Registry;
pub use store::{FileStore, MemoryStore, StateStore};
pub use zones::{AffectedZones, Applied};
