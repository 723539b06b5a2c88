//! zonereg - DNS zone inventory manager
//!
//! Keeps networks, hosts and zones in a JSON state file and renders zone files.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    zonereg_cli::run().await
}
