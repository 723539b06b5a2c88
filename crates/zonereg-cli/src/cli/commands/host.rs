//! `zonereg host` - hosts, addresses and PTR overrides.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::net::IpAddr;
use tabled::{settings::Style, Table, Tabled};
use zonereg::{
    HinfoPresetId, Host, HostPatch, Inventory, IpaddressId, IpaddressPatch, MacAddress, NewHost,
};

use super::{report, Context};
use crate::cli::args::{HostArgs, HostCommands, HostFieldArgs};
use crate::output;

/// How the reverse zone will answer for one address of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum PtrState {
    /// Derived from the only address row
    Auto,
    /// This host holds the override
    Override,
    /// Another host holds the override
    Elsewhere,
    /// Shared address without an override; no PTR is rendered
    Ambiguous,
}

impl std::fmt::Display for PtrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Override => write!(f, "override"),
            Self::Elsewhere => write!(f, "elsewhere"),
            Self::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

#[derive(Serialize, Tabled)]
struct AddressView {
    #[tabled(rename = "Id")]
    id: IpaddressId,
    #[tabled(rename = "Address")]
    address: IpAddr,
    #[tabled(rename = "MAC", display_with = "display_mac")]
    macaddress: Option<MacAddress>,
    #[tabled(rename = "PTR")]
    ptr: PtrState,
}

fn display_mac(mac: &Option<MacAddress>) -> String {
    output::cell(mac.as_ref())
}

#[derive(Serialize)]
struct HostView {
    #[serde(flatten)]
    host: Host,
    zone_name: Option<String>,
    hinfo_text: Option<String>,
    addresses: Vec<AddressView>,
    cnames: Vec<String>,
}

#[derive(Serialize, Tabled)]
struct HostRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Addresses")]
    addresses: String,
    #[tabled(rename = "Contact")]
    contact: String,
}

fn ptr_state(inv: &Inventory, host: &Host, address: IpAddr) -> PtrState {
    match inv.ptr_override_at(address) {
        Some(o) if o.host == host.id => PtrState::Override,
        Some(_) => PtrState::Elsewhere,
        None if inv.ipaddresses_at(address).len() > 1 => PtrState::Ambiguous,
        None => PtrState::Auto,
    }
}

fn host_view(inv: &Inventory, name: &str) -> zonereg::Result<HostView> {
    let host = inv.host(name)?.clone();
    let addresses = inv
        .ipaddresses_of(host.id)
        .into_iter()
        .map(|row| AddressView {
            id: row.id,
            address: row.address,
            macaddress: row.macaddress.clone(),
            ptr: ptr_state(inv, &host, row.address),
        })
        .collect();
    let mut cnames: Vec<String> = inv
        .cnames_of(host.id)
        .into_iter()
        .map(|c| c.name.clone())
        .collect();
    cnames.sort();
    Ok(HostView {
        zone_name: host
            .zone
            .and_then(|id| inv.zone_by_id(id))
            .map(|z| z.name.clone()),
        hinfo_text: host
            .hinfo
            .and_then(|id| inv.hinfo_preset(id).ok())
            .map(|p| format!("{} {}", p.cpu, p.os)),
        addresses,
        cnames,
        host,
    })
}

fn host_rows(inv: &Inventory, zone: Option<&str>) -> zonereg::Result<Vec<HostRow>> {
    let mut hosts: Vec<&Host> = match zone {
        Some(zone) => inv.hosts_in_zone(inv.zone(zone)?.id),
        None => inv.hosts().collect(),
    };
    hosts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(hosts
        .into_iter()
        .map(|h| HostRow {
            name: h.name.clone(),
            zone: output::cell(h.zone.and_then(|id| inv.zone_by_id(id)).map(|z| &z.name)),
            addresses: inv
                .ipaddresses_of(h.id)
                .iter()
                .map(|a| a.address.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            contact: h.contact.clone(),
        })
        .collect())
}

pub async fn execute(ctx: Context, args: HostArgs) -> Result<()> {
    let registry = ctx.registry().await?;

    match args.command {
        HostCommands::Create {
            name,
            contact,
            fields,
            ipaddress,
        } => {
            let new = NewHost {
                ttl: fields.ttl,
                hinfo: fields.hinfo.map(HinfoPresetId),
                loc: fields.loc,
                comment: fields.comment,
                ipaddress,
                ..NewHost::new(name, contact)
            };
            let applied = registry.write(|inv| inv.create_host(new)).await?;
            report(&ctx, &registry, applied, |h| format!("host {} created", h.name)).await
        }
        HostCommands::Show { name } => {
            let view = registry.read(|inv| host_view(inv, &name)).await?;
            output::print(ctx.output_format, &view, print_host)
        }
        HostCommands::List { zone } => {
            let rows = registry
                .read(|inv| host_rows(inv, zone.as_deref()))
                .await?;
            output::print(ctx.output_format, &rows, |rows| {
                if rows.is_empty() {
                    println!("{}", "No hosts.".dimmed());
                } else {
                    println!("{}", Table::new(rows).with(Style::rounded()));
                }
            })
        }
        HostCommands::Patch {
            name,
            rename,
            contact,
            fields,
        } => {
            let patch = host_patch(rename, contact, fields);
            let applied = registry.write(|inv| inv.patch_host(&name, patch)).await?;
            report(&ctx, &registry, applied, |h| format!("host {} updated", h.name)).await
        }
        HostCommands::Delete { name } => {
            let applied = registry.write(|inv| inv.delete_host(&name)).await?;
            report(&ctx, &registry, applied, |h| {
                format!("host {} and its addresses and records deleted", h.name)
            })
            .await
        }
        HostCommands::AddIp { host, address, mac } => {
            let applied = registry
                .write(|inv| inv.add_ipaddress(&host, address, mac))
                .await?;
            report(&ctx, &registry, applied, |row| {
                format!("{} assigned to {host} (id {})", row.address, row.id)
            })
            .await
        }
        HostCommands::PatchIp {
            id,
            address,
            mac,
            clear_mac,
        } => {
            let patch = IpaddressPatch {
                address,
                macaddress: if clear_mac { Some(None) } else { mac.map(Some) },
            };
            let applied = registry
                .write(|inv| inv.patch_ipaddress(IpaddressId(id), patch))
                .await?;
            report(&ctx, &registry, applied, |row| {
                format!("address row {} is now {}", row.id, row.address)
            })
            .await
        }
        HostCommands::DeleteIp { id } => {
            let applied = registry
                .write(|inv| inv.delete_ipaddress(IpaddressId(id)))
                .await?;
            report(&ctx, &registry, applied, |row| format!("{} removed", row.address)).await
        }
        HostCommands::SetPtr { host, address } => {
            let applied = registry
                .write(|inv| inv.set_ptr_override(&host, address))
                .await?;
            report(&ctx, &registry, applied, |p| {
                format!("{} now points to {host}", p.address)
            })
            .await
        }
        HostCommands::DeletePtr { address } => {
            let applied = registry
                .write(|inv| inv.delete_ptr_override(address))
                .await?;
            report(&ctx, &registry, applied, |p| {
                format!("PTR override for {} removed", p.address)
            })
            .await
        }
    }
}

fn host_patch(rename: Option<String>, contact: Option<String>, fields: HostFieldArgs) -> HostPatch {
    HostPatch {
        name: rename,
        contact,
        ttl: fields.ttl,
        hinfo: fields.hinfo.map(HinfoPresetId),
        loc: fields.loc,
        comment: fields.comment,
    }
}

fn print_host(view: &HostView) {
    let host = &view.host;
    println!("{} {}", "Host:".bold(), host.name.cyan().bold());
    println!();
    output::field("Zone", view.zone_name.as_ref());
    output::field("Contact", Some(&host.contact));
    output::field("TTL", host.ttl);
    output::field("HINFO", view.hinfo_text.as_ref());
    output::field("LOC", host.loc.as_ref());
    output::field("Comment", host.comment.as_ref());

    if !view.addresses.is_empty() {
        println!();
        println!("{}", "Addresses:".bold().underline());
        println!("{}", Table::new(&view.addresses).with(Style::rounded()));
        if view.addresses.iter().any(|a| a.ptr == PtrState::Ambiguous) {
            println!(
                "{}",
                "Shared addresses need a PTR override before they get a PTR record.".yellow()
            );
        }
    }

    if !view.cnames.is_empty() {
        println!();
        output::field("Aliases", Some(view.cnames.join(", ")));
    }
}
