//! `zonereg dhcp` - host bindings for DHCP servers.

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};
use zonereg::{DhcpHost, Family};

use super::Context;
use crate::cli::args::DhcpArgs;
use crate::output;

#[derive(Tabled)]
struct BindingRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "MAC")]
    mac: String,
}

pub async fn execute(ctx: Context, args: DhcpArgs) -> Result<()> {
    let registry = ctx.registry().await?;
    let family: Option<Family> = args.family.map(Into::into);
    let bindings: Vec<DhcpHost> = registry
        .read(|inv| inv.dhcp_hosts(args.range.as_ref(), family))
        .await;

    output::print(ctx.output_format, &bindings, |bindings| {
        if bindings.is_empty() {
            println!("{}", "No addresses with a MAC.".dimmed());
            return;
        }
        let rows: Vec<BindingRow> = bindings
            .iter()
            .map(|b| BindingRow {
                host: b.host.clone(),
                address: b.address.to_string(),
                mac: b.macaddress.to_string(),
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
    })
}
