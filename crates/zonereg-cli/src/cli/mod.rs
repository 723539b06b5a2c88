//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::{Context as _, Result};
use args::{Cli, Commands};
use clap::Parser;
use zonereg::RegistryConfig;

use crate::config::CliConfig;
use crate::logging;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.log_format);
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load configuration
    let config = CliConfig::load()?;

    let output_format = cli.output.or(config.output_format).unwrap_or_default();

    let registry_config_path = match cli.registry_config.or_else(|| config.registry_config.clone()) {
        Some(path) => path,
        None => CliConfig::default_registry_config()?,
    };
    let registry_config = RegistryConfig::load(&registry_config_path)
        .with_context(|| format!("loading {}", registry_config_path.display()))?;

    // --state, then the CLI config, then the registry config, then the data dir
    let state_path = match cli
        .state
        .or(config.state_path)
        .or_else(|| registry_config.state_path.clone())
    {
        Some(path) => path,
        None => CliConfig::default_state_path()?,
    };
    tracing::debug!(state = %state_path.display(), "using state file");

    let ctx = commands::Context {
        output_format,
        registry_config,
        state_path,
    };

    match cli.command {
        Commands::Network(args) => commands::network::execute(ctx, args).await,
        Commands::Zone(args) => commands::zone::execute(ctx, args).await,
        Commands::Host(args) => commands::host::execute(ctx, args).await,
        Commands::Record(args) => commands::record::execute(ctx, args).await,
        Commands::History(args) => commands::history::execute(ctx, args).await,
        Commands::Dhcp(args) => commands::dhcp::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args),
    }
}
