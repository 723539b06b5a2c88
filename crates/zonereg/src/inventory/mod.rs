//! The in-memory inventory and every operation on it.
//!
//! Each table is an ordered map keyed by surrogate id. Secondary indexes
//! (names, addresses, the zone index) are derived and rebuilt whenever a
//! [`Snapshot`] is loaded.
//!
//! Mutating operations follow one pattern: validate everything against the
//! current state first, then apply. The apply half cannot fail, so a rejected
//! operation never leaves a partial write or a stray dirty flag behind. The
//! zones a mutation touches are returned in its [`Applied`] result and marked
//! dirty through [`mark_dirty`].

mod audit;
mod dhcp;
mod hosts;
mod networks;
mod records;
mod snapshot;
mod zones;

pub use audit::Audited;
pub use records::HostRecord;
pub use snapshot::Snapshot;

use ipnet::IpNet;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::Arc;
use zonereg_core::{
    ChangeLogEntry, Cname, CnameId, Delegation, DelegationId, HinfoPreset, HinfoPresetId, Host,
    HostId, Ipaddress, IpaddressId, Mx, MxId, NameServer, NameServerId, Naptr, NaptrId, Network,
    NetworkId, PtrOverride, PtrOverrideId, RegistryError, Result, Srv, SrvId, Sshfp, SshfpId, Txt,
    TxtId, Zone, ZoneId,
};

use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::zones::{mark_dirty, AffectedZones, Applied, ZoneIndex};

/// Derived lookup tables.
#[derive(Debug, Clone, Default)]
struct Indexes {
    zones: ZoneIndex,
    zone_names: HashMap<String, ZoneId>,
    nameserver_names: HashMap<String, NameServerId>,
    host_names: HashMap<String, HostId>,
    cname_names: HashMap<String, CnameId>,
    addresses: BTreeMap<IpAddr, BTreeSet<IpaddressId>>,
    ptr_overrides: BTreeMap<IpAddr, PtrOverrideId>,
}

/// The complete DNS inventory.
#[derive(Debug, Clone)]
pub struct Inventory {
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
    last_id: u64,

    networks: BTreeMap<NetworkId, Network>,
    zones: BTreeMap<ZoneId, Zone>,
    nameservers: BTreeMap<NameServerId, NameServer>,
    delegations: BTreeMap<DelegationId, Delegation>,
    hosts: BTreeMap<HostId, Host>,
    ipaddresses: BTreeMap<IpaddressId, Ipaddress>,
    ptr_overrides: BTreeMap<PtrOverrideId, PtrOverride>,
    cnames: BTreeMap<CnameId, Cname>,
    txts: BTreeMap<TxtId, Txt>,
    mxs: BTreeMap<MxId, Mx>,
    srvs: BTreeMap<SrvId, Srv>,
    naptrs: BTreeMap<NaptrId, Naptr>,
    sshfps: BTreeMap<SshfpId, Sshfp>,
    hinfo_presets: BTreeMap<HinfoPresetId, HinfoPreset>,
    changelog: Vec<ChangeLogEntry>,

    index: Indexes,
}

impl Inventory {
    /// An empty inventory.
    pub fn new(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            last_id: 0,
            networks: BTreeMap::new(),
            zones: BTreeMap::new(),
            nameservers: BTreeMap::new(),
            delegations: BTreeMap::new(),
            hosts: BTreeMap::new(),
            ipaddresses: BTreeMap::new(),
            ptr_overrides: BTreeMap::new(),
            cnames: BTreeMap::new(),
            txts: BTreeMap::new(),
            mxs: BTreeMap::new(),
            srvs: BTreeMap::new(),
            naptrs: BTreeMap::new(),
            sshfps: BTreeMap::new(),
            hinfo_presets: BTreeMap::new(),
            changelog: Vec::new(),
            index: Indexes::default(),
        }
    }

    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Allocate the next surrogate id. Ids are unique across all tables.
    fn allocate<I: From<u64>>(&mut self) -> I {
        self.last_id += 1;
        I::from(self.last_id)
    }

    /// Mark the affected zones dirty and wrap the result.
    fn commit<T>(&mut self, value: T, affected: AffectedZones) -> Applied<T> {
        mark_dirty(&mut self.zones, &affected, self.clock.now());
        Applied::new(value, affected)
    }

    fn check_ttl(&self, field: &'static str, ttl: Option<u32>) -> Result<()> {
        zonereg_core::validate::ttl_opt(field, ttl, self.config.ttl.min, self.config.ttl.max)
    }

    // ----- zone lookups -------------------------------------------------

    /// The zone index for host-to-zone resolution.
    pub const fn zone_index(&self) -> &ZoneIndex {
        &self.index.zones
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    /// Zone by name.
    pub fn zone(&self, name: &str) -> Result<&Zone> {
        let key = name.trim_end_matches('.').to_lowercase();
        self.index
            .zone_names
            .get(&key)
            .and_then(|id| self.zones.get(id))
            .ok_or_else(|| RegistryError::not_found("zone", name))
    }

    pub fn zone_by_id(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    pub fn nameservers(&self) -> impl Iterator<Item = &NameServer> {
        self.nameservers.values()
    }

    pub fn nameserver(&self, id: NameServerId) -> Option<&NameServer> {
        self.nameservers.get(&id)
    }

    pub fn nameserver_by_name(&self, name: &str) -> Option<&NameServer> {
        self.index
            .nameserver_names
            .get(name)
            .and_then(|id| self.nameservers.get(id))
    }

    /// Delegations of a zone, ordered by name.
    pub fn delegations_of(&self, zone: ZoneId) -> Vec<&Delegation> {
        let mut delegations: Vec<&Delegation> =
            self.delegations.values().filter(|d| d.zone == zone).collect();
        delegations.sort_by(|a, b| a.name.cmp(&b.name));
        delegations
    }

    // ----- host lookups -------------------------------------------------

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    /// Host by name.
    pub fn host(&self, name: &str) -> Result<&Host> {
        let key = name.trim_end_matches('.').to_lowercase();
        self.index
            .host_names
            .get(&key)
            .and_then(|id| self.hosts.get(id))
            .ok_or_else(|| RegistryError::not_found("host", name))
    }

    pub fn host_by_id(&self, id: HostId) -> Option<&Host> {
        self.hosts.get(&id)
    }

    /// Hosts owned by a zone, ordered by name.
    pub fn hosts_in_zone(&self, zone: ZoneId) -> Vec<&Host> {
        let mut hosts: Vec<&Host> = self
            .hosts
            .values()
            .filter(|h| h.zone == Some(zone))
            .collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        hosts
    }

    /// Addresses of a host, ordered by address.
    pub fn ipaddresses_of(&self, host: HostId) -> Vec<&Ipaddress> {
        let mut addrs: Vec<&Ipaddress> = self
            .ipaddresses
            .values()
            .filter(|a| a.host == host)
            .collect();
        addrs.sort_by_key(|a| a.address);
        addrs
    }

    pub fn ipaddress(&self, id: IpaddressId) -> Result<&Ipaddress> {
        self.ipaddresses
            .get(&id)
            .ok_or_else(|| RegistryError::not_found("ipaddress", id))
    }

    /// Every Ipaddress row holding `addr`.
    pub fn ipaddresses_at(&self, addr: IpAddr) -> Vec<&Ipaddress> {
        self.index
            .addresses
            .get(&addr)
            .into_iter()
            .flatten()
            .filter_map(|id| self.ipaddresses.get(id))
            .collect()
    }

    /// Distinct assigned addresses inside `range`, ascending.
    pub fn addresses_in(&self, range: &IpNet) -> Vec<IpAddr> {
        self.index
            .addresses
            .range(range.network()..=range.broadcast())
            .map(|(addr, _)| *addr)
            .collect()
    }

    pub fn ptr_override_at(&self, addr: IpAddr) -> Option<&PtrOverride> {
        self.index
            .ptr_overrides
            .get(&addr)
            .and_then(|id| self.ptr_overrides.get(id))
    }

    /// PTR overrides inside `range`, ordered by address.
    pub fn ptr_overrides_in(&self, range: &IpNet) -> Vec<&PtrOverride> {
        self.index
            .ptr_overrides
            .range(range.network()..=range.broadcast())
            .filter_map(|(_, id)| self.ptr_overrides.get(id))
            .collect()
    }

    // ----- record lookups -----------------------------------------------

    /// CNAME by alias.
    pub fn cname(&self, name: &str) -> Result<&Cname> {
        let key = name.trim_end_matches('.').to_lowercase();
        self.index
            .cname_names
            .get(&key)
            .and_then(|id| self.cnames.get(id))
            .ok_or_else(|| RegistryError::not_found("cname", name))
    }

    /// CNAMEs owned by a zone, ordered by alias.
    pub fn cnames_in_zone(&self, zone: ZoneId) -> Vec<&Cname> {
        let mut cnames: Vec<&Cname> = self
            .cnames
            .values()
            .filter(|c| c.zone == Some(zone))
            .collect();
        cnames.sort_by(|a, b| a.name.cmp(&b.name));
        cnames
    }

    /// CNAMEs pointing at a host.
    pub fn cnames_of(&self, host: HostId) -> Vec<&Cname> {
        self.cnames.values().filter(|c| c.host == host).collect()
    }

    pub fn srv(&self, id: SrvId) -> Result<&Srv> {
        self.srvs
            .get(&id)
            .ok_or_else(|| RegistryError::not_found("srv", id))
    }

    /// SRV records owned by a zone, ordered by name, priority, weight, port.
    pub fn srvs_in_zone(&self, zone: ZoneId) -> Vec<&Srv> {
        let mut srvs: Vec<&Srv> = self
            .srvs
            .values()
            .filter(|s| s.zone == Some(zone))
            .collect();
        srvs.sort_by(|a, b| {
            (&a.name, a.priority, a.weight, a.port, a.id).cmp(&(
                &b.name, b.priority, b.weight, b.port, b.id,
            ))
        });
        srvs
    }

    /// SRV records targeting a host.
    pub fn srvs_of(&self, host: HostId) -> Vec<&Srv> {
        self.srvs.values().filter(|s| s.host == host).collect()
    }

    pub fn hinfo_presets(&self) -> impl Iterator<Item = &HinfoPreset> {
        self.hinfo_presets.values()
    }

    pub fn hinfo_preset(&self, id: HinfoPresetId) -> Result<&HinfoPreset> {
        self.hinfo_presets
            .get(&id)
            .ok_or_else(|| RegistryError::not_found("hinfo preset", id))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use zonereg_core::{NewHost, NewZone};

    /// Inventory on 2026-10-19 with zone `example.org` and network `10.0.0.0/24`.
    pub fn inventory() -> (Inventory, FixedClock) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap());
        let mut inv = Inventory::new(RegistryConfig::default(), Arc::new(clock.clone()));
        inv.create_zone(NewZone::new(
            "example.org",
            ["ns1.example.org", "ns2.example.net"],
            "hostmaster@example.org",
        ))
        .unwrap();
        inv.create_network("10.0.0.0/24".parse().unwrap(), Default::default())
            .unwrap();
        (inv, clock)
    }

    /// Create a host with one address.
    pub fn host(inv: &mut Inventory, name: &str, addr: &str) -> Host {
        inv.create_host(
            NewHost::new(name, "ops@example.org").with_ipaddress(addr.parse().unwrap()),
        )
        .unwrap()
        .value
    }

    /// Render every zone so no dirty flags remain.
    pub fn clean(inv: &mut Inventory) {
        let names: Vec<String> = inv.zones().map(|z| z.name.clone()).collect();
        for name in names {
            inv.render_zone(&name).unwrap();
        }
    }
}
