//! `zonereg history` - the audit log.

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};
use zonereg::{ChangeAction, ChangeLogEntry};

use super::Context;
use crate::cli::args::{HistoryArgs, HistoryCommands};
use crate::output;

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "When")]
    timestamp: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Data")]
    data: String,
}

impl From<&ChangeLogEntry> for EntryRow {
    fn from(e: &ChangeLogEntry) -> Self {
        let action = match e.action {
            ChangeAction::Saved => e.action.to_string().green().to_string(),
            ChangeAction::Deleted => e.action.to_string().red().to_string(),
        };
        Self {
            timestamp: e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            action,
            data: e.data.to_string(),
        }
    }
}

pub async fn execute(ctx: Context, args: HistoryArgs) -> Result<()> {
    let registry = ctx.registry().await?;

    match args.command {
        HistoryCommands::Tables => {
            let tables: Vec<String> = registry
                .read(|inv| inv.tracked_tables().into_iter().map(str::to_string).collect())
                .await;
            output::print(ctx.output_format, &tables, |tables| {
                for table in tables {
                    println!("{table}");
                }
            })
        }
        HistoryCommands::Show { table, row } => {
            let entries: Vec<ChangeLogEntry> = registry
                .read(|inv| inv.history(&table, row).into_iter().cloned().collect())
                .await;
            output::print(ctx.output_format, &entries, |entries| {
                if entries.is_empty() {
                    println!("{}", format!("No history for {table} row {row}.").dimmed());
                    return;
                }
                println!("{} {} {}", "History of".bold(), table.cyan(), row.to_string().cyan());
                let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
                println!("{}", Table::new(&rows).with(Style::rounded()));
            })
        }
    }
}
