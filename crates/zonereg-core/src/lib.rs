//! Core types for the zonereg DNS inventory.
//!
//! This crate provides the foundational types shared by the engine and the CLI:
//!
//! - **Types**: networks, hosts, addresses, auxiliary records, zones and the
//!   audit log, each with its creation and patch inputs
//! - **Validation**: field validators for hostnames, MACs, TTLs and record data
//! - **Errors**: the [`RegistryError`] taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use zonereg_core::{validate, RegistryError, Result};
//!
//! fn check(name: &str) -> Result<String> {
//!     validate::hostname("name", name)
//! }
//! ```

mod error;
pub mod types;
pub mod validate;

pub use error::{ErrorKind, RegistryError, Result};
pub use types::*;
