//! `zonereg record` - auxiliary records attached to hosts.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use zonereg::{
    Cname, HinfoPreset, HinfoPresetId, HostRecord, Inventory, Mx, Naptr, NewHinfoPreset, Registry,
    Srv, SrvId, Sshfp, Txt,
};

use super::{report, Context};
use crate::cli::args::{
    CnameCommands, HinfoCommands, MxCommands, NaptrCommands, RecordArgs, RecordCommands,
    SrvCommands, SshfpCommands, TxtCommands,
};
use crate::output;

enum Action<N> {
    Add(N),
    Update(u64, N),
    Delete(u64),
}

/// Every record that renders under, or points at, one host.
#[derive(Serialize)]
struct HostRecords {
    host: String,
    cnames: Vec<Cname>,
    txts: Vec<Txt>,
    mxs: Vec<Mx>,
    srvs: Vec<Srv>,
    naptrs: Vec<Naptr>,
    sshfps: Vec<Sshfp>,
}

fn cloned<R: HostRecord>(inv: &Inventory, host: zonereg::HostId) -> Vec<R> {
    inv.records_of::<R>(host).into_iter().cloned().collect()
}

fn host_records(inv: &Inventory, name: &str) -> zonereg::Result<HostRecords> {
    let host = inv.host(name)?;
    let mut cnames: Vec<Cname> = inv.cnames_of(host.id).into_iter().cloned().collect();
    cnames.sort_by(|a, b| a.name.cmp(&b.name));
    let mut srvs: Vec<Srv> = inv.srvs_of(host.id).into_iter().cloned().collect();
    srvs.sort_by(|a, b| (&a.name, a.priority, a.id).cmp(&(&b.name, b.priority, b.id)));
    Ok(HostRecords {
        host: host.name.clone(),
        cnames,
        txts: cloned(inv, host.id),
        mxs: cloned(inv, host.id),
        srvs,
        naptrs: cloned(inv, host.id),
        sshfps: cloned(inv, host.id),
    })
}

#[derive(Tabled)]
struct HinfoRow {
    #[tabled(rename = "Id")]
    id: HinfoPresetId,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "OS")]
    os: String,
}

pub async fn execute(ctx: Context, args: RecordArgs) -> Result<()> {
    let registry = ctx.registry().await?;

    match args.command {
        RecordCommands::List { host } => {
            let records = registry.read(|inv| host_records(inv, &host)).await?;
            output::print(ctx.output_format, &records, print_records)
        }
        RecordCommands::Cname { command } => cname(&ctx, &registry, command).await,
        RecordCommands::Txt { command } => {
            let action = match command {
                TxtCommands::Add(f) => Action::Add(f.into()),
                TxtCommands::Update { id, fields } => Action::Update(id, fields.into()),
                TxtCommands::Delete { id } => Action::Delete(id),
            };
            host_record::<Txt>(&ctx, &registry, action).await
        }
        RecordCommands::Mx { command } => {
            let action = match command {
                MxCommands::Add(f) => Action::Add(f.into()),
                MxCommands::Update { id, fields } => Action::Update(id, fields.into()),
                MxCommands::Delete { id } => Action::Delete(id),
            };
            host_record::<Mx>(&ctx, &registry, action).await
        }
        RecordCommands::Naptr { command } => {
            let action = match command {
                NaptrCommands::Add(f) => Action::Add(f.into()),
                NaptrCommands::Update { id, fields } => Action::Update(id, fields.into()),
                NaptrCommands::Delete { id } => Action::Delete(id),
            };
            host_record::<Naptr>(&ctx, &registry, action).await
        }
        RecordCommands::Sshfp { command } => {
            let action = match command {
                SshfpCommands::Add(f) => Action::Add(f.into()),
                SshfpCommands::Update { id, fields } => Action::Update(id, fields.into()),
                SshfpCommands::Delete { id } => Action::Delete(id),
            };
            host_record::<Sshfp>(&ctx, &registry, action).await
        }
        RecordCommands::Srv { command } => srv(&ctx, &registry, command).await,
        RecordCommands::Hinfo { command } => hinfo(&ctx, &registry, command).await,
    }
}

async fn host_record<R: HostRecord>(
    ctx: &Context,
    registry: &Registry,
    action: Action<R::New>,
) -> Result<()> {
    let (applied, verb) = match action {
        Action::Add(new) => (registry.write(|inv| inv.create_record::<R>(new)).await?, "added"),
        Action::Update(id, new) => (
            registry
                .write(|inv| inv.update_record::<R>(R::Id::from(id), new))
                .await?,
            "updated",
        ),
        Action::Delete(id) => (
            registry
                .write(|inv| inv.delete_record::<R>(R::Id::from(id)))
                .await?,
            "deleted",
        ),
    };
    report(ctx, registry, applied, |r| {
        format!("{} record {} {verb}", R::KIND, r.id())
    })
    .await
}

async fn cname(ctx: &Context, registry: &Registry, command: CnameCommands) -> Result<()> {
    let (applied, verb) = match command {
        CnameCommands::Add(f) => (
            registry.write(|inv| inv.create_cname(f.into())).await?,
            "added",
        ),
        CnameCommands::Update { current, fields } => (
            registry
                .write(|inv| inv.update_cname(&current, fields.into()))
                .await?,
            "updated",
        ),
        CnameCommands::Delete { name } => (
            registry.write(|inv| inv.delete_cname(&name)).await?,
            "deleted",
        ),
    };
    report(ctx, registry, applied, |c| format!("alias {} {verb}", c.name)).await
}

async fn srv(ctx: &Context, registry: &Registry, command: SrvCommands) -> Result<()> {
    let (applied, verb) = match command {
        SrvCommands::Add(f) => (
            registry.write(|inv| inv.create_srv(f.into())).await?,
            "added",
        ),
        SrvCommands::Update { id, fields } => (
            registry
                .write(|inv| inv.update_srv(SrvId(id), fields.into()))
                .await?,
            "updated",
        ),
        SrvCommands::Delete { id } => (
            registry.write(|inv| inv.delete_srv(SrvId(id))).await?,
            "deleted",
        ),
    };
    report(ctx, registry, applied, |s| {
        format!("srv {} ({}) {verb}", s.name, s.id)
    })
    .await
}

async fn hinfo(ctx: &Context, registry: &Registry, command: HinfoCommands) -> Result<()> {
    match command {
        HinfoCommands::List => {
            let mut presets: Vec<HinfoPreset> =
                registry.read(|inv| inv.hinfo_presets().cloned().collect()).await;
            presets.sort_by_key(|p| p.id);
            output::print(ctx.output_format, &presets, |presets| {
                if presets.is_empty() {
                    println!("{}", "No HINFO presets.".dimmed());
                    return;
                }
                let rows: Vec<HinfoRow> = presets
                    .iter()
                    .map(|p| HinfoRow {
                        id: p.id,
                        cpu: p.cpu.clone(),
                        os: p.os.clone(),
                    })
                    .collect();
                println!("{}", Table::new(&rows).with(Style::rounded()));
            })
        }
        HinfoCommands::Add { cpu, os } => {
            let preset = registry
                .write(|inv| inv.create_hinfo_preset(NewHinfoPreset { cpu, os }))
                .await?;
            output::print(ctx.output_format, &preset, |p| {
                output::success(format!("hinfo preset {} added ({} {})", p.id, p.cpu, p.os));
            })
        }
        HinfoCommands::Delete { id } => {
            let preset = registry
                .write(|inv| inv.delete_hinfo_preset(HinfoPresetId(id)))
                .await?;
            output::print(ctx.output_format, &preset, |p| {
                output::success(format!("hinfo preset {} deleted", p.id));
            })
        }
    }
}

fn print_records(records: &HostRecords) {
    println!("{} {}", "Records of".bold(), records.host.cyan().bold());

    let mut lines: Vec<(&str, String)> = Vec::new();
    lines.extend(
        records
            .cnames
            .iter()
            .map(|c| ("CNAME", format!("{} (id {})", c.name, c.id))),
    );
    lines.extend(
        records
            .txts
            .iter()
            .map(|t| ("TXT", format!("[{}] \"{}\"", t.id, t.txt))),
    );
    lines.extend(
        records
            .mxs
            .iter()
            .map(|m| ("MX", format!("[{}] {} {}", m.id, m.priority, m.mx))),
    );
    lines.extend(records.srvs.iter().map(|s| {
        (
            "SRV",
            format!(
                "[{}] {} {} {} {}",
                s.id, s.name, s.priority, s.weight, s.port
            ),
        )
    }));
    lines.extend(records.naptrs.iter().map(|n| {
        (
            "NAPTR",
            format!(
                "[{}] {} {} \"{}\" \"{}\" \"{}\" {}",
                n.id, n.order, n.preference, n.flag, n.service, n.regex, n.replacement
            ),
        )
    }));
    lines.extend(records.sshfps.iter().map(|s| {
        (
            "SSHFP",
            format!("[{}] {} {} {}", s.id, s.algorithm, s.hash_type, s.fingerprint),
        )
    }));

    if lines.is_empty() {
        println!("{}", "  No records.".dimmed());
    }
    for (kind, text) in lines {
        println!("  {} {text}", format!("{kind:<6}").yellow());
    }
}
