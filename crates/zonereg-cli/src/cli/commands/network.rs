//! `zonereg network` - address ranges and allocation.

use anyhow::Result;
use colored::Colorize;
use ipnet::IpNet;
use serde::Serialize;
use std::net::IpAddr;
use tabled::{settings::Style, Table, Tabled};
use zonereg::{AddressSpace, Inventory, Network, NetworkPatch};

use super::Context;
use crate::cli::args::{NetworkArgs, NetworkCommands};
use crate::output;

#[derive(Tabled)]
struct NetworkRow {
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "VLAN")]
    vlan: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Reserved")]
    reserved: u32,
    #[tabled(rename = "Frozen")]
    frozen: bool,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&Network> for NetworkRow {
    fn from(n: &Network) -> Self {
        Self {
            range: n.range.to_string(),
            vlan: output::cell(n.vlan),
            category: output::cell(n.category.as_ref()),
            location: output::cell(n.location.as_ref()),
            reserved: n.reserved,
            frozen: n.frozen,
            description: output::cell(n.description.as_ref()),
        }
    }
}

/// A network with its allocation counters.
#[derive(Serialize)]
struct Usage {
    #[serde(flatten)]
    network: Network,
    /// Number of addresses, as text since it can exceed 64 bits
    size: String,
    used: u64,
    unused: u64,
    /// Unused counts only cover the first addresses of the range
    unused_bounded: bool,
    first_unused: Option<IpAddr>,
}

fn usage(inv: &Inventory, range: &IpNet) -> zonereg::Result<Usage> {
    let network = inv.network(range)?.clone();
    let space = inv.address_space(range)?;
    Ok(Usage {
        network,
        size: space.size().to_string(),
        used: space.used_count(),
        unused: space.unused_count(),
        unused_bounded: space.family().bounds_enumeration(),
        first_unused: space.first_unused(),
    })
}

#[derive(Serialize, Tabled)]
struct PtrRow {
    #[tabled(rename = "Address")]
    address: IpAddr,
    #[tabled(rename = "Host")]
    host: String,
}

pub async fn execute(ctx: Context, args: NetworkArgs) -> Result<()> {
    let registry = ctx.registry().await?;

    match args.command {
        NetworkCommands::Create { range, attrs } => {
            let network = registry
                .write(|inv| inv.create_network(range, attrs.into()))
                .await?;
            output::print(ctx.output_format, &network, |n| {
                output::success(format!("network {} created ({} reserved)", n.range, n.reserved));
            })
        }
        NetworkCommands::Show { range } => {
            let usage = registry.read(|inv| usage(inv, &range)).await?;
            output::print(ctx.output_format, &usage, print_usage)
        }
        NetworkCommands::List => {
            let networks: Vec<Network> = registry
                .read(|inv| inv.networks().cloned().collect())
                .await;
            output::print(ctx.output_format, &networks, |networks| {
                if networks.is_empty() {
                    println!("{}", "No networks.".dimmed());
                    return;
                }
                let rows: Vec<NetworkRow> = networks.iter().map(NetworkRow::from).collect();
                println!("{}", Table::new(&rows).with(Style::rounded()));
            })
        }
        NetworkCommands::Patch {
            range,
            new_range,
            attrs,
        } => {
            let patch = NetworkPatch {
                range: new_range,
                attrs: attrs.into(),
            };
            let network = registry
                .write(|inv| inv.patch_network(&range, patch))
                .await?;
            output::print(ctx.output_format, &network, |n| {
                output::success(format!("network {} updated", n.range));
            })
        }
        NetworkCommands::Delete { range } => {
            let network = registry.write(|inv| inv.delete_network(&range)).await?;
            output::print(ctx.output_format, &network, |n| {
                output::success(format!("network {} deleted", n.range));
            })
        }
        NetworkCommands::ByIp { address } => {
            let network = registry
                .read(|inv| inv.network_by_ip(address).cloned())
                .await
                .ok_or_else(|| anyhow::anyhow!("no network contains {address}"))?;
            output::print(ctx.output_format, &network, |n| {
                println!("{}", n.range.to_string().cyan().bold());
            })
        }
        NetworkCommands::Reserved { range } => {
            let space = registry.read(|inv| inv.address_space(&range)).await?;
            let addresses: Vec<IpAddr> = space.reserved_addresses().into_iter().collect();
            output::print(ctx.output_format, addresses.as_slice(), print_addresses)
        }
        NetworkCommands::Used { range } => {
            let space = registry.read(|inv| inv.address_space(&range)).await?;
            output::print(ctx.output_format, space.used_addresses(), print_addresses)
        }
        NetworkCommands::Unused { range, limit } => {
            let space = registry.read(|inv| inv.address_space(&range)).await?;
            let addresses: Vec<IpAddr> = space.unused().take(limit).collect();
            output::print(ctx.output_format, &addresses, |addresses| {
                print_addresses(addresses);
                print_window_note(&space);
            })
        }
        NetworkCommands::FirstUnused { range } => {
            let first = registry
                .read(|inv| inv.address_space(&range))
                .await?
                .first_unused();
            output::print(ctx.output_format, &first, |first| match first {
                Some(addr) => println!("{}", addr.to_string().green()),
                None => println!("{}", "Network is full.".red()),
            })
        }
        NetworkCommands::PtrOverrides { range } => {
            let rows: Vec<PtrRow> = registry
                .read(|inv| {
                    inv.ptr_overrides_in(&range)
                        .into_iter()
                        .map(|p| PtrRow {
                            address: p.address,
                            host: inv
                                .host_by_id(p.host)
                                .map(|h| h.name.clone())
                                .unwrap_or_default(),
                        })
                        .collect()
                })
                .await;
            output::print(ctx.output_format, &rows, |rows| {
                if rows.is_empty() {
                    println!("{}", "No PTR overrides.".dimmed());
                } else {
                    println!("{}", Table::new(rows).with(Style::rounded()));
                }
            })
        }
    }
}

fn print_usage(usage: &Usage) {
    let n = &usage.network;
    println!("{} {}", "Network:".bold(), n.range.to_string().cyan().bold());
    println!();
    output::field("Description", n.description.as_ref());
    output::field("VLAN", n.vlan);
    output::field("Category", n.category.as_ref());
    output::field("Location", n.location.as_ref());
    output::field("Frozen", Some(n.frozen));
    output::field("DNS delegated", Some(n.dns_delegated));
    output::field("Reserved", Some(n.reserved));
    println!();
    output::field("Size", Some(&usage.size));
    output::field("Used", Some(usage.used));
    let unused = if usage.unused_bounded {
        format!("{} (first window only)", usage.unused)
    } else {
        usage.unused.to_string()
    };
    output::field("Unused", Some(unused));
    output::field("First unused", usage.first_unused);
}

fn print_addresses(addresses: &[IpAddr]) {
    if addresses.is_empty() {
        println!("{}", "None.".dimmed());
    }
    for addr in addresses {
        println!("{addr}");
    }
}

fn print_window_note(space: &AddressSpace) {
    if space.family().bounds_enumeration() {
        println!(
            "{}",
            "Only the first addresses of large ranges are searched.".dimmed()
        );
    }
}
