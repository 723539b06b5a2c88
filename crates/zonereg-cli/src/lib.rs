//! # zonereg-cli
//!
//! Command-line interface for the zonereg DNS zone inventory.
//!
//! ## Features
//!
//! - **Networks**: create, patch and delete ranges, inspect reserved, used and
//!   unused addresses
//! - **Zones**: SOA fields, nameservers, delegations and zone file rendering
//! - **Hosts and records**: addresses, PTR overrides, CNAME/TXT/MX/SRV/NAPTR/SSHFP
//! - **Audit**: per-row change history
//! - **Multiple output formats**: pretty tables, JSON, YAML

pub mod cli;
pub mod config;
pub mod logging;
pub mod output;

pub use cli::run;
