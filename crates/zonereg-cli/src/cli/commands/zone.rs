//! `zonereg zone` - zones, nameservers, delegations and rendering.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeSet;
use tabled::{settings::Style, Table, Tabled};
use zonereg::{Inventory, NameServerId, NewDelegation, NewZone, Zone, ZonePatch};

use super::{report, Context};
use crate::cli::args::{SoaArgs, ZoneArgs, ZoneCommands};
use crate::output;

/// A zone with its nameservers and delegations resolved to names.
#[derive(Serialize)]
struct ZoneView {
    name: String,
    kind: String,
    primary_ns: String,
    email: String,
    serialno: u64,
    refresh: u32,
    retry: u32,
    expire: u32,
    ttl: u32,
    nameservers: Vec<String>,
    delegations: Vec<DelegationView>,
    updated: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct DelegationView {
    name: String,
    nameservers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Serial")]
    serialno: u64,
    #[tabled(rename = "Primary NS")]
    primary_ns: String,
    #[tabled(rename = "Dirty")]
    updated: bool,
}

fn kind_label(zone: &Zone) -> String {
    match zone.kind.network() {
        Some(network) => format!("reverse {network}"),
        None => "forward".to_string(),
    }
}

fn nameserver_names(inv: &Inventory, ids: &BTreeSet<NameServerId>) -> Vec<String> {
    let mut names: Vec<String> = ids
        .iter()
        .filter_map(|id| inv.nameserver(*id).map(|ns| ns.name.clone()))
        .collect();
    names.sort();
    names
}

fn zone_view(inv: &Inventory, name: &str) -> zonereg::Result<ZoneView> {
    let zone = inv.zone(name)?;
    let delegations = inv
        .delegations_of(zone.id)
        .into_iter()
        .map(|d| DelegationView {
            name: d.name.clone(),
            nameservers: nameserver_names(inv, &d.nameservers),
            comment: d.comment.clone(),
        })
        .collect();
    Ok(ZoneView {
        name: zone.name.clone(),
        kind: kind_label(zone),
        primary_ns: zone.primary_ns.clone(),
        email: zone.email.clone(),
        serialno: zone.serialno,
        refresh: zone.refresh,
        retry: zone.retry,
        expire: zone.expire,
        ttl: zone.ttl,
        nameservers: nameserver_names(inv, &zone.nameservers),
        delegations,
        updated: zone.updated,
        updated_at: zone.updated_at,
    })
}

pub async fn execute(ctx: Context, args: ZoneArgs) -> Result<()> {
    let registry = ctx.registry().await?;

    match args.command {
        ZoneCommands::Create {
            name,
            nameservers,
            email,
            primary_ns,
            soa,
        } => {
            let new = NewZone {
                primary_ns,
                refresh: soa.refresh,
                retry: soa.retry,
                expire: soa.expire,
                ttl: soa.ttl,
                ..NewZone::new(name, nameservers, email)
            };
            let applied = registry.write(|inv| inv.create_zone(new)).await?;
            report(&ctx, &registry, applied, |z| {
                format!("zone {} created with serial {}", z.name, z.serialno)
            })
            .await
        }
        ZoneCommands::Show { name } => {
            let view = registry.read(|inv| zone_view(inv, &name)).await?;
            output::print(ctx.output_format, &view, print_zone)
        }
        ZoneCommands::List => {
            let zones: Vec<Zone> = registry.read(|inv| inv.zones().cloned().collect()).await;
            output::print(ctx.output_format, &zones, |zones| {
                if zones.is_empty() {
                    println!("{}", "No zones.".dimmed());
                    return;
                }
                let rows: Vec<ZoneRow> = zones
                    .iter()
                    .map(|z| ZoneRow {
                        name: z.name.clone(),
                        kind: kind_label(z),
                        serialno: z.serialno,
                        primary_ns: z.primary_ns.clone(),
                        updated: z.updated,
                    })
                    .collect();
                println!("{}", Table::new(&rows).with(Style::rounded()));
            })
        }
        ZoneCommands::Patch {
            name,
            primary_ns,
            email,
            soa,
        } => {
            let patch = zone_patch(primary_ns, email, soa);
            let applied = registry.write(|inv| inv.patch_zone(&name, patch)).await?;
            report(&ctx, &registry, applied, |z| format!("zone {} updated", z.name)).await
        }
        ZoneCommands::Delete { name } => {
            let applied = registry.write(|inv| inv.delete_zone(&name)).await?;
            report(&ctx, &registry, applied, |z| format!("zone {} deleted", z.name)).await
        }
        ZoneCommands::SetNs { name, nameservers } => {
            let applied = registry
                .write(|inv| inv.set_nameservers(&name, &nameservers))
                .await?;
            report(&ctx, &registry, applied, |z| {
                format!("zone {} now served by {}", z.name, nameservers.join(", "))
            })
            .await
        }
        ZoneCommands::NsTtl { nameserver, ttl } => {
            let applied = registry
                .write(|inv| inv.set_nameserver_ttl(&nameserver, ttl))
                .await?;
            report(&ctx, &registry, applied, |ns| match ns.ttl {
                Some(ttl) => format!("nameserver {} ttl set to {ttl}", ns.name),
                None => format!("nameserver {} ttl cleared", ns.name),
            })
            .await
        }
        ZoneCommands::Delegate {
            zone,
            name,
            nameservers,
            comment,
        } => {
            let new = NewDelegation {
                name,
                nameservers,
                comment,
            };
            let applied = registry.write(|inv| inv.add_delegation(&zone, new)).await?;
            report(&ctx, &registry, applied, |d| format!("{} delegated", d.name)).await
        }
        ZoneCommands::Undelegate { zone, name } => {
            let applied = registry
                .write(|inv| inv.remove_delegation(&zone, &name))
                .await?;
            report(&ctx, &registry, applied, |d| format!("delegation {} removed", d.name)).await
        }
        ZoneCommands::Render { name, file } => {
            let text = registry.render(&name).await?;
            match file {
                Some(path) => {
                    std::fs::write(&path, &text)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(zone = %name, path = %path.display(), "zone file written");
                    output::success(format!("{name} written to {}", path.display()));
                }
                None => print!("{text}"),
            }
            Ok(())
        }
    }
}

fn zone_patch(primary_ns: Option<String>, email: Option<String>, soa: SoaArgs) -> ZonePatch {
    ZonePatch {
        primary_ns,
        email,
        refresh: soa.refresh,
        retry: soa.retry,
        expire: soa.expire,
        ttl: soa.ttl,
    }
}

fn print_zone(zone: &ZoneView) {
    println!("{} {}", "Zone:".bold(), zone.name.cyan().bold());
    println!();
    output::field("Kind", Some(&zone.kind));
    output::field("Serial", Some(zone.serialno));
    let state = if zone.updated {
        "changed since last render".yellow().to_string()
    } else {
        "rendered".green().to_string()
    };
    output::field("State", Some(state));
    output::field("Updated at", Some(zone.updated_at.to_rfc3339()));
    output::field("Primary NS", Some(&zone.primary_ns));
    output::field("Email", Some(&zone.email));
    output::field(
        "Timers",
        Some(format!(
            "refresh {} retry {} expire {} ttl {}",
            zone.refresh, zone.retry, zone.expire, zone.ttl
        )),
    );

    println!();
    println!("{}", "Nameservers:".bold().underline());
    for ns in &zone.nameservers {
        println!("  {ns}");
    }

    if !zone.delegations.is_empty() {
        println!();
        println!("{}", "Delegations:".bold().underline());
        for d in &zone.delegations {
            println!("  {} {}", d.name.cyan(), d.nameservers.join(", ").dimmed());
        }
    }
}
