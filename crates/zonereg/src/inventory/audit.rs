//! Append-only change log.

use serde::Serialize;
use zonereg_core::{
    ChangeAction, ChangeLogEntry, Cname, Delegation, HinfoPreset, Host, Ipaddress, Mx, NameServer,
    Naptr, Network, PtrOverride, Srv, Sshfp, Txt, Zone,
};

use super::Inventory;

/// A row type whose saves and deletes are written to the change log.
pub trait Audited: Serialize {
    /// Table name used in the log
    const TABLE: &'static str;

    /// Surrogate id of the row
    fn row(&self) -> u64;
}

macro_rules! audited {
    ($($ty:ty => $table:literal),+ $(,)?) => {
        $(
            impl Audited for $ty {
                const TABLE: &'static str = $table;

                fn row(&self) -> u64 {
                    self.id.0
                }
            }
        )+
    };
}

audited!(
    Network => "networks",
    Zone => "zones",
    NameServer => "nameservers",
    Delegation => "delegations",
    Host => "hosts",
    Ipaddress => "ipaddresses",
    PtrOverride => "ptr_overrides",
    Cname => "cnames",
    Txt => "txts",
    Mx => "mxs",
    Srv => "srvs",
    Naptr => "naptrs",
    Sshfp => "sshfps",
    HinfoPreset => "hinfo_presets",
);

impl Inventory {
    fn log<T: Audited>(&mut self, row: &T, action: ChangeAction) {
        let id = self.allocate();
        self.changelog.push(ChangeLogEntry {
            id,
            table: T::TABLE.to_string(),
            row: row.row(),
            data: serde_json::to_value(row).unwrap_or_default(),
            action,
            timestamp: self.clock.now(),
        });
    }

    /// Log a save of `row`.
    pub(super) fn saved<T: Audited>(&mut self, row: &T) {
        self.log(row, ChangeAction::Saved);
    }

    /// Log a delete of `row`.
    pub(super) fn deleted<T: Audited>(&mut self, row: &T) {
        self.log(row, ChangeAction::Deleted);
    }

    /// Distinct table names present in the change log, sorted.
    pub fn tracked_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self.changelog.iter().map(|e| e.table.as_str()).collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    }

    /// Every entry for one row, oldest first.
    pub fn history(&self, table: &str, row: u64) -> Vec<&ChangeLogEntry> {
        let mut entries: Vec<&ChangeLogEntry> = self
            .changelog
            .iter()
            .filter(|e| e.table == table && e.row == row)
            .collect();
        entries.sort_by_key(|e| e.timestamp);
        entries
    }

    /// The full change log in append order.
    pub fn changelog(&self) -> &[ChangeLogEntry] {
        &self.changelog
    }
}
