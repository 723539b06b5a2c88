use std::collections::BTreeSet;
use zonereg_core::validate;
use zonereg_core::{
    Delegation, NameServer, NameServerId, NewDelegation, NewZone, RegistryError, Result, Zone,
    ZoneKind, ZonePatch,
};

use super::Inventory;
use crate::serial::create_serial;
use crate::zones::{is_below, parse_zone_kind, update_serial_if_dirty, AffectedZones, Applied};

/// Validate a nameserver list: non-empty, valid FQDNs, no duplicates.
fn check_nameserver_list(names: &[String]) -> Result<Vec<String>> {
    if names.is_empty() {
        return Err(RegistryError::invalid(
            "nameservers",
            "at least one nameserver is required",
        ));
    }
    let mut seen = BTreeSet::new();
    let mut checked = Vec::with_capacity(names.len());
    for name in names {
        let name = validate::hostname("nameservers", name)?;
        if !seen.insert(name.clone()) {
            return Err(RegistryError::invalid(
                "nameservers",
                format!("{name} is listed twice"),
            ));
        }
        checked.push(name);
    }
    Ok(checked)
}

/// Reverse grammars that may be delegated below a zone of `parent` kind.
const fn same_family(parent: &ZoneKind, child: &ZoneKind) -> bool {
    use ipnet::IpNet;
    match (parent, child) {
        (ZoneKind::Forward, ZoneKind::Forward) => true,
        (
            ZoneKind::Reverse {
                network: IpNet::V4(_),
            }
            | ZoneKind::Classless { .. },
            ZoneKind::Reverse {
                network: IpNet::V4(_),
            }
            | ZoneKind::Classless { .. },
        ) => true,
        (
            ZoneKind::Reverse {
                network: IpNet::V6(_),
            },
            ZoneKind::Reverse {
                network: IpNet::V6(_),
            },
        ) => true,
        _ => false,
    }
}

impl Inventory {
    /// Zone that contains `name`'s records before `name` itself is a zone.
    fn parent_zone_of(&self, name: &str, kind: &ZoneKind) -> Option<zonereg_core::ZoneId> {
        match kind {
            ZoneKind::Forward => name
                .split_once('.')
                .and_then(|(_, parent)| self.index.zones.forward_zone_for(parent)),
            _ => self.index.zones.reverse_parent_of(kind),
        }
    }

    /// Ids for `names`, creating missing nameserver rows.
    fn nameserver_ids(&mut self, names: &[String]) -> BTreeSet<NameServerId> {
        let mut ids = BTreeSet::new();
        for name in names {
            if let Some(id) = self.index.nameserver_names.get(name) {
                ids.insert(*id);
                continue;
            }
            let ns = NameServer {
                id: self.allocate(),
                name: name.clone(),
                ttl: None,
            };
            self.index.nameserver_names.insert(ns.name.clone(), ns.id);
            self.nameservers.insert(ns.id, ns.clone());
            self.saved(&ns);
            ids.insert(ns.id);
        }
        ids
    }

    /// Delete nameserver rows no zone or delegation refers to.
    fn cleanup_nameservers(&mut self) {
        let in_use: BTreeSet<NameServerId> = self
            .zones
            .values()
            .flat_map(|z| z.nameservers.iter().copied())
            .chain(
                self.delegations
                    .values()
                    .flat_map(|d| d.nameservers.iter().copied()),
            )
            .collect();
        let orphans: Vec<NameServer> = self
            .nameservers
            .values()
            .filter(|ns| !in_use.contains(&ns.id))
            .cloned()
            .collect();
        for ns in orphans {
            self.nameservers.remove(&ns.id);
            self.index.nameserver_names.remove(&ns.name);
            tracing::debug!(nameserver = %ns.name, "unused nameserver removed");
            self.deleted(&ns);
        }
    }

    /// Recompute the owning zone of every host, CNAME and SRV after the set
    /// of zones changed. Returns both the old and new zone of each move.
    fn reresolve(&mut self) -> AffectedZones {
        let mut affected = AffectedZones::new();
        let index = &self.index.zones;

        let mut moved_hosts = Vec::new();
        for host in self.hosts.values_mut() {
            let zone = index.forward_zone_for(&host.name);
            if zone != host.zone {
                affected.extend([host.zone, zone]);
                host.zone = zone;
                moved_hosts.push(host.clone());
            }
        }
        let mut moved_cnames = Vec::new();
        for cname in self.cnames.values_mut() {
            let zone = index.forward_zone_for(&cname.name);
            if zone != cname.zone {
                affected.extend([cname.zone, zone]);
                cname.zone = zone;
                moved_cnames.push(cname.clone());
            }
        }
        let mut moved_srvs = Vec::new();
        for srv in self.srvs.values_mut() {
            let zone = index.forward_zone_for(&srv.name);
            if zone != srv.zone {
                affected.extend([srv.zone, zone]);
                srv.zone = zone;
                moved_srvs.push(srv.clone());
            }
        }

        if !(moved_hosts.is_empty() && moved_cnames.is_empty() && moved_srvs.is_empty()) {
            tracing::debug!(
                hosts = moved_hosts.len(),
                cnames = moved_cnames.len(),
                srvs = moved_srvs.len(),
                "zone membership re-resolved"
            );
        }
        for host in &moved_hosts {
            self.saved(host);
        }
        for cname in &moved_cnames {
            self.saved(cname);
        }
        for srv in &moved_srvs {
            self.saved(srv);
        }
        affected
    }

    /// Create a zone. Its serial starts at today's first serial and it
    /// starts out dirty. Hosts and records below it move into it.
    pub fn create_zone(&mut self, new: NewZone) -> Result<Applied<Zone>> {
        let name = validate::zone_name("name", &new.name)?;
        let kind = parse_zone_kind("name", &name)?;
        if self.index.zone_names.contains_key(&name) {
            return Err(RegistryError::Conflict(format!("zone {name} already exists")));
        }
        let nameservers = check_nameserver_list(&new.nameservers)?;
        let primary_ns = match new.primary_ns {
            Some(primary) => {
                let primary = validate::hostname("primary_ns", &primary)?;
                if !nameservers.contains(&primary) {
                    return Err(RegistryError::invalid(
                        "primary_ns",
                        format!("{primary} is not one of the zone's nameservers"),
                    ));
                }
                primary
            }
            None => nameservers[0].clone(),
        };
        let email = validate::email("email", &new.email)?;
        let soa = self.config.soa;
        let refresh = validate::positive("refresh", new.refresh.unwrap_or(soa.refresh))?;
        let retry = validate::positive("retry", new.retry.unwrap_or(soa.retry))?;
        let expire = validate::positive("expire", new.expire.unwrap_or(soa.expire))?;
        let ttl = validate::positive("ttl", new.ttl.unwrap_or(soa.ttl))?;
        let serialno = create_serial(None, self.clock.today())?;

        let parent = self.parent_zone_of(&name, &kind);
        let nameservers = self.nameserver_ids(&nameservers);
        let zone = Zone {
            id: self.allocate(),
            name,
            kind,
            primary_ns,
            email,
            serialno,
            refresh,
            retry,
            expire,
            ttl,
            nameservers,
            updated: true,
            updated_at: self.clock.now(),
        };
        self.index.zones.insert(&zone);
        self.index.zone_names.insert(zone.name.clone(), zone.id);
        self.zones.insert(zone.id, zone.clone());
        self.saved(&zone);
        tracing::info!(zone = %zone.name, serial = zone.serialno, "zone created");

        let mut affected = self.reresolve();
        affected.insert(zone.id);
        affected.insert_opt(parent);
        Ok(self.commit(zone, affected))
    }

    /// Update SOA fields. The primary nameserver must already serve the zone.
    pub fn patch_zone(&mut self, name: &str, patch: ZonePatch) -> Result<Applied<Zone>> {
        let mut zone = self.zone(name)?.clone();

        let primary_ns = match &patch.primary_ns {
            Some(primary) => {
                let primary = validate::hostname("primary_ns", primary)?;
                let serves = zone
                    .nameservers
                    .iter()
                    .filter_map(|id| self.nameservers.get(id))
                    .any(|ns| ns.name == primary);
                if !serves {
                    return Err(RegistryError::invalid(
                        "primary_ns",
                        format!("{primary} is not one of the zone's nameservers"),
                    ));
                }
                Some(primary)
            }
            None => None,
        };
        let email = patch
            .email
            .as_deref()
            .map(|e| validate::email("email", e))
            .transpose()?;
        let refresh = patch.refresh.map(|v| validate::positive("refresh", v)).transpose()?;
        let retry = patch.retry.map(|v| validate::positive("retry", v)).transpose()?;
        let expire = patch.expire.map(|v| validate::positive("expire", v)).transpose()?;
        let ttl = patch.ttl.map(|v| validate::positive("ttl", v)).transpose()?;

        zone.primary_ns = primary_ns.unwrap_or(zone.primary_ns);
        zone.email = email.unwrap_or(zone.email);
        zone.refresh = refresh.unwrap_or(zone.refresh);
        zone.retry = retry.unwrap_or(zone.retry);
        zone.expire = expire.unwrap_or(zone.expire);
        zone.ttl = ttl.unwrap_or(zone.ttl);

        self.zones.insert(zone.id, zone.clone());
        self.saved(&zone);
        tracing::info!(zone = %zone.name, "zone updated");
        let affected = AffectedZones::from_iter([zone.id]);
        Ok(self.commit(zone, affected))
    }

    /// Delete a zone with its delegations and any nameserver no longer used
    /// elsewhere. Hosts and records move to the next enclosing zone, if any.
    pub fn delete_zone(&mut self, name: &str) -> Result<Applied<Zone>> {
        let zone = self.zone(name)?.clone();

        let delegations: Vec<Delegation> = self
            .delegations
            .values()
            .filter(|d| d.zone == zone.id)
            .cloned()
            .collect();
        for delegation in &delegations {
            self.delegations.remove(&delegation.id);
            self.deleted(delegation);
        }
        self.zones.remove(&zone.id);
        self.index.zones.remove(&zone);
        self.index.zone_names.remove(&zone.name);
        self.deleted(&zone);
        self.cleanup_nameservers();
        tracing::info!(zone = %zone.name, "zone deleted");

        let mut affected = self.reresolve();
        affected.insert_opt(self.parent_zone_of(&zone.name, &zone.kind));
        Ok(self.commit(zone, affected))
    }

    /// Replace the nameserver set. The first entry becomes the primary.
    pub fn set_nameservers(&mut self, name: &str, nameservers: &[String]) -> Result<Applied<Zone>> {
        let mut zone = self.zone(name)?.clone();
        let names = check_nameserver_list(nameservers)?;

        zone.nameservers = self.nameserver_ids(&names);
        zone.primary_ns = names[0].clone();
        self.zones.insert(zone.id, zone.clone());
        self.saved(&zone);
        self.cleanup_nameservers();
        tracing::info!(zone = %zone.name, nameservers = names.len(), "nameservers updated");
        let affected = AffectedZones::from_iter([zone.id]);
        Ok(self.commit(zone, affected))
    }

    /// Set the TTL of a nameserver's NS lines in every zone that lists it.
    pub fn set_nameserver_ttl(&mut self, name: &str, ttl: Option<u32>) -> Result<Applied<NameServer>> {
        let key = validate::hostname("name", name)?;
        let mut ns = self
            .nameserver_by_name(&key)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("nameserver", name))?;
        self.check_ttl("ttl", ttl)?;

        ns.ttl = ttl;
        self.nameservers.insert(ns.id, ns.clone());
        self.saved(&ns);

        let affected: AffectedZones = self
            .zones
            .values()
            .filter(|z| z.nameservers.contains(&ns.id))
            .map(|z| z.id)
            .chain(
                self.delegations
                    .values()
                    .filter(|d| d.nameservers.contains(&ns.id))
                    .map(|d| d.zone),
            )
            .collect();
        Ok(self.commit(ns, affected))
    }

    /// Delegate a subtree of a zone to other nameservers.
    pub fn add_delegation(&mut self, zone: &str, new: NewDelegation) -> Result<Applied<Delegation>> {
        let parent = self.zone(zone)?.clone();
        let name = validate::zone_name("name", &new.name)?;
        if !is_below(&name, &parent.name) {
            return Err(RegistryError::invalid(
                "name",
                format!("{name} is not below {}", parent.name),
            ));
        }
        let kind = parse_zone_kind("name", &name)?;
        if !same_family(&parent.kind, &kind) {
            return Err(RegistryError::invalid(
                "name",
                format!("{name} does not follow the naming of {}", parent.name),
            ));
        }
        if self.delegations.values().any(|d| d.name == name) {
            return Err(RegistryError::Conflict(format!(
                "delegation {name} already exists"
            )));
        }
        let nameservers = check_nameserver_list(&new.nameservers)?;

        let nameservers = self.nameserver_ids(&nameservers);
        let delegation = Delegation {
            id: self.allocate(),
            zone: parent.id,
            name,
            nameservers,
            comment: new.comment,
        };
        self.delegations.insert(delegation.id, delegation.clone());
        self.saved(&delegation);
        tracing::info!(zone = %parent.name, delegation = %delegation.name, "delegation added");
        let affected = AffectedZones::from_iter([parent.id]);
        Ok(self.commit(delegation, affected))
    }

    /// Remove a delegation from a zone.
    pub fn remove_delegation(&mut self, zone: &str, name: &str) -> Result<Applied<Delegation>> {
        let parent = self.zone(zone)?.clone();
        let key = name.trim_end_matches('.').to_lowercase();
        let delegation = self
            .delegations
            .values()
            .find(|d| d.zone == parent.id && d.name == key)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("delegation", name))?;

        self.delegations.remove(&delegation.id);
        self.deleted(&delegation);
        self.cleanup_nameservers();
        tracing::info!(zone = %parent.name, delegation = %delegation.name, "delegation removed");
        let affected = AffectedZones::from_iter([parent.id]);
        Ok(self.commit(delegation, affected))
    }

    /// Render a zone file. A dirty zone gets its next serial first; the
    /// serial is only kept if rendering succeeds.
    pub fn render_zone(&mut self, name: &str) -> Result<String> {
        let mut zone = self.zone(name)?.clone();
        let bumped = update_serial_if_dirty(&mut zone, self.clock.today())?;
        let text = crate::render::render_zone(self, &zone)?;
        if bumped {
            self.zones.insert(zone.id, zone.clone());
            self.saved(&zone);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use crate::inventory::testing;
    use zonereg_core::{ErrorKind, NewDelegation, NewHost, NewZone, ZonePatch};

    fn zone(name: &str) -> NewZone {
        NewZone::new(name, ["ns1.example.org"], "hostmaster@example.org")
    }

    #[test]
    fn test_same_day_zones_share_serial() {
        let (mut inv, _) = testing::inventory();
        let com = inv.create_zone(zone("example.com")).unwrap().value;
        let org = inv.zone("example.org").unwrap();
        assert_eq!(com.serialno, org.serialno);
        assert_eq!(com.serialno, 2_026_101_901);
        assert!(com.updated);
    }

    #[test]
    fn test_duplicate_zone_conflicts() {
        let (mut inv, _) = testing::inventory();
        let err = inv.create_zone(zone("Example.ORG.")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_subzone_takes_over_hosts() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "host1.sub.example.org", "10.0.0.10");
        let parent = inv.zone("example.org").unwrap().id;
        assert_eq!(inv.host("host1.sub.example.org").unwrap().zone, Some(parent));
        testing::clean(&mut inv);

        let sub = inv.create_zone(zone("sub.example.org")).unwrap();
        assert!(sub.affected.contains(parent));
        assert_eq!(
            inv.host("host1.sub.example.org").unwrap().zone,
            Some(sub.value.id)
        );
        assert!(inv.zone("example.org").unwrap().updated);

        testing::clean(&mut inv);
        inv.delete_zone("sub.example.org").unwrap();
        assert_eq!(inv.host("host1.sub.example.org").unwrap().zone, Some(parent));
        assert!(inv.zone("example.org").unwrap().updated);
    }

    #[test]
    fn test_delete_zone_cleans_up_nameservers() {
        let (mut inv, _) = testing::inventory();
        inv.create_zone(NewZone::new(
            "example.com",
            ["ns1.example.org", "ns.example.com"],
            "hostmaster@example.com",
        ))
        .unwrap();
        assert!(inv.nameserver_by_name("ns.example.com").is_some());

        inv.delete_zone("example.com").unwrap();
        assert!(inv.nameserver_by_name("ns.example.com").is_none());
        assert!(inv.nameserver_by_name("ns1.example.org").is_some());
    }

    #[test]
    fn test_patch_primary_must_be_a_nameserver() {
        let (mut inv, _) = testing::inventory();
        let err = inv
            .patch_zone(
                "example.org",
                ZonePatch {
                    primary_ns: Some("ns9.example.org".into()),
                    ..ZonePatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let zone = inv
            .patch_zone(
                "example.org",
                ZonePatch {
                    primary_ns: Some("ns2.example.net".into()),
                    refresh: Some(7200),
                    ..ZonePatch::default()
                },
            )
            .unwrap()
            .value;
        assert_eq!(zone.primary_ns, "ns2.example.net");
        assert_eq!(zone.refresh, 7200);

        let err = inv
            .patch_zone(
                "example.org",
                ZonePatch {
                    retry: Some(0),
                    ..ZonePatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_set_nameservers() {
        let (mut inv, _) = testing::inventory();
        assert!(inv.set_nameservers("example.org", &[]).is_err());

        let zone = inv
            .set_nameservers("example.org", &["ns3.example.org".into()])
            .unwrap()
            .value;
        assert_eq!(zone.primary_ns, "ns3.example.org");
        assert_eq!(zone.nameservers.len(), 1);
        assert!(inv.nameserver_by_name("ns1.example.org").is_none());
    }

    #[test]
    fn test_nameserver_ttl_marks_zones() {
        let (mut inv, _) = testing::inventory();
        testing::clean(&mut inv);
        let applied = inv
            .set_nameserver_ttl("ns1.example.org", Some(3600))
            .unwrap();
        assert_eq!(applied.value.ttl, Some(3600));
        assert!(inv.zone("example.org").unwrap().updated);
        assert!(inv.set_nameserver_ttl("ns1.example.org", Some(10)).is_err());
        assert!(inv.set_nameserver_ttl("nope.example.org", None).is_err());
    }

    #[test]
    fn test_delegation_rules() {
        let (mut inv, _) = testing::inventory();
        let delegate = |name: &str| NewDelegation {
            name: name.into(),
            nameservers: vec!["ns.sub.example.org".into()],
            comment: None,
        };

        inv.add_delegation("example.org", delegate("sub.example.org"))
            .unwrap();
        assert_eq!(
            inv.add_delegation("example.org", delegate("sub.example.org"))
                .unwrap_err()
                .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            inv.add_delegation("example.org", delegate("example.com"))
                .unwrap_err()
                .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            inv.add_delegation("example.org", delegate("example.org"))
                .unwrap_err()
                .kind(),
            ErrorKind::Validation
        );

        inv.create_zone(zone("0.10.in-addr.arpa")).unwrap();
        inv.add_delegation("0.10.in-addr.arpa", delegate("128/25.0.0.10.in-addr.arpa"))
            .unwrap();
        assert!(inv
            .add_delegation("0.10.in-addr.arpa", delegate("www.0.10.in-addr.arpa"))
            .is_err());

        inv.remove_delegation("example.org", "sub.example.org")
            .unwrap();
        assert!(inv.delegations_of(inv.zone("example.org").unwrap().id).is_empty());
    }

    #[test]
    fn test_render_consumes_dirty_flag_once() {
        let (mut inv, _) = testing::inventory();
        inv.create_host(NewHost::new("www.example.org", "ops@example.org"))
            .unwrap();
        let before = inv.zone("example.org").unwrap().serialno;

        let first = inv.render_zone("example.org").unwrap();
        let after = inv.zone("example.org").unwrap().serialno;
        assert_eq!(after, before + 1);
        assert!(!inv.zone("example.org").unwrap().updated);

        let second = inv.render_zone("example.org").unwrap();
        assert_eq!(first, second);
        assert_eq!(inv.zone("example.org").unwrap().serialno, after);
    }
}
