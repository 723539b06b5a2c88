//! `zonereg config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::CliConfig;
use crate::output;

pub fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Set { key, value } => {
            let mut config = CliConfig::load()?;
            config.set(&key, &value)?;
            config.save()?;
            output::success(format!("{key} set to {}.", value.cyan()));
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", CliConfig::path()?.display());
            Ok(())
        }
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = CliConfig::load()?;

    output::print(ctx.output_format, &config, |config| {
        println!("{}", "Current Configuration:".bold());
        println!();
        output::field("state_path", config.state_path.as_ref().map(|p| p.display()));
        output::field(
            "registry_config",
            config.registry_config.as_ref().map(|p| p.display()),
        );
        output::field("output_format", config.output_format);
        println!();
        output::field("effective state", Some(ctx.state_path.display()));
    })
}
