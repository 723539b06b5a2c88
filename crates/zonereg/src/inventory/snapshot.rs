//! Flat, serializable form of the inventory.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;
use zonereg_core::{
    ChangeLogEntry, Cname, Delegation, HinfoPreset, Host, Ipaddress, Mx, NameServer, Naptr,
    Network, PtrOverride, RegistryError, Result, Srv, Sshfp, Txt, Zone,
};

use super::{Audited, Indexes, Inventory};
use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::zones::ZoneIndex;

/// Every table as a flat list plus the id sequence. Indexes are not part
/// of the snapshot; they are rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub last_id: u64,
    pub networks: Vec<Network>,
    pub zones: Vec<Zone>,
    pub nameservers: Vec<NameServer>,
    pub delegations: Vec<Delegation>,
    pub hosts: Vec<Host>,
    pub ipaddresses: Vec<Ipaddress>,
    pub ptr_overrides: Vec<PtrOverride>,
    pub cnames: Vec<Cname>,
    pub txts: Vec<Txt>,
    pub mxs: Vec<Mx>,
    pub srvs: Vec<Srv>,
    pub naptrs: Vec<Naptr>,
    pub sshfps: Vec<Sshfp>,
    pub hinfo_presets: Vec<HinfoPreset>,
    pub changelog: Vec<ChangeLogEntry>,
}

/// Key a table by id, rejecting repeated ids.
fn table<K: Ord + Copy, T: Audited>(rows: Vec<T>, id: impl Fn(&T) -> K) -> Result<BTreeMap<K, T>> {
    let mut map = BTreeMap::new();
    for row in rows {
        let key = id(&row);
        let number = row.row();
        if map.insert(key, row).is_some() {
            return Err(RegistryError::Storage(format!(
                "duplicate row {number} in {}",
                T::TABLE
            )));
        }
    }
    Ok(map)
}

/// Build a unique-name index over a table.
fn unique<'a, K, V, T: 'a>(
    what: &str,
    rows: impl IntoIterator<Item = &'a T>,
    entry: impl Fn(&T) -> (K, V),
) -> Result<HashMap<K, V>>
where
    K: Eq + Hash + std::fmt::Display,
{
    let mut index = HashMap::new();
    for row in rows {
        let (key, value) = entry(row);
        if index.contains_key(&key) {
            return Err(RegistryError::Storage(format!("duplicate {what} {key}")));
        }
        index.insert(key, value);
    }
    Ok(index)
}

impl Inventory {
    /// Copy every table out.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            last_id: self.last_id,
            networks: self.networks.values().cloned().collect(),
            zones: self.zones.values().cloned().collect(),
            nameservers: self.nameservers.values().cloned().collect(),
            delegations: self.delegations.values().cloned().collect(),
            hosts: self.hosts.values().cloned().collect(),
            ipaddresses: self.ipaddresses.values().cloned().collect(),
            ptr_overrides: self.ptr_overrides.values().cloned().collect(),
            cnames: self.cnames.values().cloned().collect(),
            txts: self.txts.values().cloned().collect(),
            mxs: self.mxs.values().cloned().collect(),
            srvs: self.srvs.values().cloned().collect(),
            naptrs: self.naptrs.values().cloned().collect(),
            sshfps: self.sshfps.values().cloned().collect(),
            hinfo_presets: self.hinfo_presets.values().cloned().collect(),
            changelog: self.changelog.clone(),
        }
    }

    /// Rebuild an inventory from a snapshot. Duplicate ids or natural keys
    /// are a storage error.
    pub fn from_snapshot(
        config: RegistryConfig,
        clock: Arc<dyn Clock>,
        snapshot: Snapshot,
    ) -> Result<Self> {
        let mut inv = Self::new(config, clock);

        inv.networks = table(snapshot.networks, |n| n.id)?;
        inv.zones = table(snapshot.zones, |z| z.id)?;
        inv.nameservers = table(snapshot.nameservers, |n| n.id)?;
        inv.delegations = table(snapshot.delegations, |d| d.id)?;
        inv.hosts = table(snapshot.hosts, |h| h.id)?;
        inv.ipaddresses = table(snapshot.ipaddresses, |a| a.id)?;
        inv.ptr_overrides = table(snapshot.ptr_overrides, |p| p.id)?;
        inv.cnames = table(snapshot.cnames, |c| c.id)?;
        inv.txts = table(snapshot.txts, |t| t.id)?;
        inv.mxs = table(snapshot.mxs, |m| m.id)?;
        inv.srvs = table(snapshot.srvs, |s| s.id)?;
        inv.naptrs = table(snapshot.naptrs, |n| n.id)?;
        inv.sshfps = table(snapshot.sshfps, |s| s.id)?;
        inv.hinfo_presets = table(snapshot.hinfo_presets, |p| p.id)?;
        inv.changelog = snapshot.changelog;

        inv.index = inv.build_indexes()?;
        inv.last_id = snapshot.last_id.max(inv.max_id());
        tracing::debug!(
            zones = inv.zones.len(),
            hosts = inv.hosts.len(),
            last_id = inv.last_id,
            "inventory loaded"
        );
        Ok(inv)
    }

    fn build_indexes(&self) -> Result<Indexes> {
        let mut addresses: BTreeMap<_, std::collections::BTreeSet<_>> = BTreeMap::new();
        for row in self.ipaddresses.values() {
            addresses.entry(row.address).or_default().insert(row.id);
        }
        let mut ptr_overrides = BTreeMap::new();
        for ptr in self.ptr_overrides.values() {
            if ptr_overrides.insert(ptr.address, ptr.id).is_some() {
                return Err(RegistryError::Storage(format!(
                    "duplicate ptr override for {}",
                    ptr.address
                )));
            }
        }

        Ok(Indexes {
            zones: ZoneIndex::build(self.zones.values()),
            zone_names: unique("zone", self.zones.values(), |z| (z.name.clone(), z.id))?,
            nameserver_names: unique("nameserver", self.nameservers.values(), |n| {
                (n.name.clone(), n.id)
            })?,
            host_names: unique("host", self.hosts.values(), |h| (h.name.clone(), h.id))?,
            cname_names: unique("cname", self.cnames.values(), |c| (c.name.clone(), c.id))?,
            addresses,
            ptr_overrides,
        })
    }

    /// Highest id used by any row or log entry.
    fn max_id(&self) -> u64 {
        [
            self.networks.keys().next_back().map(|k| k.0),
            self.zones.keys().next_back().map(|k| k.0),
            self.nameservers.keys().next_back().map(|k| k.0),
            self.delegations.keys().next_back().map(|k| k.0),
            self.hosts.keys().next_back().map(|k| k.0),
            self.ipaddresses.keys().next_back().map(|k| k.0),
            self.ptr_overrides.keys().next_back().map(|k| k.0),
            self.cnames.keys().next_back().map(|k| k.0),
            self.txts.keys().next_back().map(|k| k.0),
            self.mxs.keys().next_back().map(|k| k.0),
            self.srvs.keys().next_back().map(|k| k.0),
            self.naptrs.keys().next_back().map(|k| k.0),
            self.sshfps.keys().next_back().map(|k| k.0),
            self.hinfo_presets.keys().next_back().map(|k| k.0),
            self.changelog.iter().map(|e| e.id.0).max(),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0)
    }
}
