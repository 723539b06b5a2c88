use std::net::IpAddr;
use zonereg_core::validate;
use zonereg_core::{
    Host, HostId, HostPatch, Ipaddress, IpaddressId, IpaddressPatch, MacAddress, NetworkId,
    NewHost, PtrOverride, RegistryError, Result,
};

use super::Inventory;
use crate::address::Family;
use crate::zones::{is_within, AffectedZones, Applied};

/// Scope inside which a MAC address may appear only once.
#[derive(Debug, PartialEq, Eq)]
enum MacDomain {
    /// Networks sharing a VLAN, split by address family
    Vlan(u32, Family),
    /// A network without a VLAN
    Network(NetworkId),
    /// Addresses outside every network
    Global,
}

impl Inventory {
    fn mac_domain(&self, addr: IpAddr) -> MacDomain {
        match self.network_by_ip(addr) {
            Some(network) => match network.vlan {
                Some(vlan) => MacDomain::Vlan(vlan, Family::of(&addr)),
                None => MacDomain::Network(network.id),
            },
            None => MacDomain::Global,
        }
    }

    fn check_mac(&self, addr: IpAddr, mac: &MacAddress, excluding: Option<IpaddressId>) -> Result<()> {
        let domain = self.mac_domain(addr);
        let clash = self.ipaddresses.values().find(|other| {
            Some(other.id) != excluding
                && other.macaddress.as_ref() == Some(mac)
                && self.mac_domain(other.address) == domain
        });
        match clash {
            Some(other) => Err(RegistryError::Conflict(format!(
                "macaddress {mac} is already in use by {}",
                other.address
            ))),
            None => Ok(()),
        }
    }

    fn check_name_free(&self, name: &str) -> Result<()> {
        if self.index.host_names.contains_key(name) {
            return Err(RegistryError::Conflict(format!("host {name} already exists")));
        }
        if self.index.cname_names.contains_key(name) {
            return Err(RegistryError::Conflict(format!("{name} is already a cname")));
        }
        Ok(())
    }

    fn check_host_fields(
        &self,
        ttl: Option<u32>,
        hinfo: Option<zonereg_core::HinfoPresetId>,
        loc: Option<&str>,
    ) -> Result<Option<String>> {
        self.check_ttl("ttl", ttl)?;
        if let Some(hinfo) = hinfo {
            self.hinfo_preset(hinfo)?;
        }
        loc.map(|l| validate::loc("loc", l)).transpose()
    }

    /// The host's forward zone plus the reverse zones of its addresses and
    /// PTR overrides.
    fn host_footprint(&self, host: &Host) -> AffectedZones {
        let mut affected = AffectedZones::new();
        affected.insert_opt(host.zone);
        let addresses = self
            .ipaddresses
            .values()
            .filter(|a| a.host == host.id)
            .map(|a| a.address)
            .chain(
                self.ptr_overrides
                    .values()
                    .filter(|p| p.host == host.id)
                    .map(|p| p.address),
            );
        affected.extend(addresses.map(|a| self.index.zones.reverse_zone_for(a)));
        affected.merge(self.glue_footprint(&host.name));
        affected
    }

    /// Parent zones that render glue for the nameserver called `name`.
    fn glue_footprint(&self, name: &str) -> AffectedZones {
        let mut affected = AffectedZones::new();
        if let Some(ns) = self.index.nameserver_names.get(name) {
            affected.extend(
                self.delegations
                    .values()
                    .filter(|d| d.nameservers.contains(ns) && is_within(name, &d.name))
                    .map(|d| Some(d.zone)),
            );
        }
        affected
    }

    /// Zones rendering the host's name as a target.
    fn target_footprint(&self, host: HostId) -> AffectedZones {
        let mut affected = AffectedZones::new();
        affected.extend(self.cnames.values().filter(|c| c.host == host).map(|c| c.zone));
        affected.extend(self.srvs.values().filter(|s| s.host == host).map(|s| s.zone));
        affected
    }

    fn insert_ipaddress(&mut self, row: Ipaddress) {
        self.index
            .addresses
            .entry(row.address)
            .or_default()
            .insert(row.id);
        self.ipaddresses.insert(row.id, row.clone());
        self.saved(&row);
    }

    fn remove_ipaddress(&mut self, id: IpaddressId) {
        if let Some(row) = self.ipaddresses.remove(&id) {
            if let Some(ids) = self.index.addresses.get_mut(&row.address) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.index.addresses.remove(&row.address);
                }
            }
            self.deleted(&row);
        }
    }

    fn remove_ptr_override(&mut self, ptr: &PtrOverride) {
        self.ptr_overrides.remove(&ptr.id);
        self.index.ptr_overrides.remove(&ptr.address);
        self.deleted(ptr);
    }

    /// Create a host, optionally with its first address.
    pub fn create_host(&mut self, new: NewHost) -> Result<Applied<Host>> {
        let name = validate::hostname("name", &new.name)?;
        self.check_name_free(&name)?;
        let contact = validate::email("contact", &new.contact)?;
        let loc = self.check_host_fields(new.ttl, new.hinfo, new.loc.as_deref())?;

        let host = Host {
            id: self.allocate(),
            zone: self.index.zones.forward_zone_for(&name),
            name,
            contact,
            ttl: new.ttl,
            hinfo: new.hinfo,
            loc,
            comment: new.comment,
        };
        self.index.host_names.insert(host.name.clone(), host.id);
        self.hosts.insert(host.id, host.clone());
        self.saved(&host);

        if let Some(address) = new.ipaddress {
            let row = Ipaddress {
                id: self.allocate(),
                host: host.id,
                address,
                macaddress: None,
            };
            self.insert_ipaddress(row);
        }
        tracing::info!(host = %host.name, "host created");

        let affected = self.host_footprint(&host);
        Ok(self.commit(host, affected))
    }

    /// Patch a host. Renames re-resolve the owning zone; comment-only
    /// changes do not touch any zone.
    pub fn patch_host(&mut self, name: &str, patch: HostPatch) -> Result<Applied<Host>> {
        let mut host = self.host(name)?.clone();

        let new_name = match &patch.name {
            Some(n) => {
                let n = validate::hostname("name", n)?;
                if n != host.name {
                    self.check_name_free(&n)?;
                    Some(n)
                } else {
                    None
                }
            }
            None => None,
        };
        let contact = patch
            .contact
            .as_deref()
            .map(|c| validate::email("contact", c))
            .transpose()?;
        let loc = self.check_host_fields(patch.ttl, patch.hinfo, patch.loc.as_deref())?;

        let touches = patch.touches_rendered_data();
        let mut affected = AffectedZones::new();
        if touches {
            affected.merge(self.host_footprint(&host));
        }
        if let Some(new_name) = new_name {
            affected.merge(self.target_footprint(host.id));
            self.index.host_names.remove(&host.name);
            self.index.host_names.insert(new_name.clone(), host.id);
            host.zone = self.index.zones.forward_zone_for(&new_name);
            tracing::info!(from = %host.name, to = %new_name, "host renamed");
            host.name = new_name;
        }
        host.contact = contact.unwrap_or(host.contact);
        if patch.ttl.is_some() {
            host.ttl = patch.ttl;
        }
        if patch.hinfo.is_some() {
            host.hinfo = patch.hinfo;
        }
        if loc.is_some() {
            host.loc = loc;
        }
        if patch.comment.is_some() {
            host.comment = patch.comment;
        }

        self.hosts.insert(host.id, host.clone());
        self.saved(&host);
        if touches {
            affected.merge(self.host_footprint(&host));
        }
        Ok(self.commit(host, affected))
    }

    /// Delete a host together with its addresses, PTR overrides and every
    /// record that belongs to or targets it.
    pub fn delete_host(&mut self, name: &str) -> Result<Applied<Host>> {
        let host = self.host(name)?.clone();
        let mut affected = self.host_footprint(&host);
        affected.merge(self.target_footprint(host.id));

        let addresses: Vec<IpaddressId> = self
            .ipaddresses
            .values()
            .filter(|a| a.host == host.id)
            .map(|a| a.id)
            .collect();
        for id in addresses {
            self.remove_ipaddress(id);
        }
        let overrides: Vec<PtrOverride> = self
            .ptr_overrides
            .values()
            .filter(|p| p.host == host.id)
            .cloned()
            .collect();
        for ptr in &overrides {
            self.remove_ptr_override(ptr);
        }
        self.remove_records_of(host.id);

        self.hosts.remove(&host.id);
        self.index.host_names.remove(&host.name);
        self.deleted(&host);
        tracing::info!(host = %host.name, "host deleted");
        Ok(self.commit(host, affected))
    }

    /// Assign an address to a host.
    pub fn add_ipaddress(
        &mut self,
        host: &str,
        address: IpAddr,
        macaddress: Option<MacAddress>,
    ) -> Result<Applied<Ipaddress>> {
        let host = self.host(host)?.clone();
        if self
            .ipaddresses_at(address)
            .iter()
            .any(|a| a.host == host.id)
        {
            return Err(RegistryError::Conflict(format!(
                "{} already has address {address}",
                host.name
            )));
        }
        if let Some(mac) = &macaddress {
            self.check_mac(address, mac, None)?;
        }

        let row = Ipaddress {
            id: self.allocate(),
            host: host.id,
            address,
            macaddress,
        };
        self.insert_ipaddress(row.clone());
        tracing::info!(host = %host.name, %address, "address assigned");

        let mut affected = self.glue_footprint(&host.name);
        affected.extend([host.zone, self.index.zones.reverse_zone_for(address)]);
        Ok(self.commit(row, affected))
    }

    /// Change the address or MAC of an address row.
    pub fn patch_ipaddress(&mut self, id: IpaddressId, patch: IpaddressPatch) -> Result<Applied<Ipaddress>> {
        let row = self.ipaddress(id)?.clone();
        let address = patch.address.unwrap_or(row.address);
        if address != row.address
            && self
                .ipaddresses_at(address)
                .iter()
                .any(|a| a.host == row.host)
        {
            return Err(RegistryError::Conflict(format!(
                "host already has address {address}"
            )));
        }
        let macaddress = patch.macaddress.unwrap_or_else(|| row.macaddress.clone());
        if let Some(mac) = &macaddress {
            self.check_mac(address, mac, Some(id))?;
        }

        let owner = self.hosts.get(&row.host);
        let zone = owner.and_then(|h| h.zone);
        let mut affected =
            owner.map_or_else(AffectedZones::new, |h| self.glue_footprint(&h.name));
        affected.extend([
            zone,
            self.index.zones.reverse_zone_for(row.address),
            self.index.zones.reverse_zone_for(address),
        ]);

        self.remove_ipaddress(id);
        let updated = Ipaddress {
            address,
            macaddress,
            ..row
        };
        self.insert_ipaddress(updated.clone());
        Ok(self.commit(updated, affected))
    }

    /// Remove an address from its host.
    pub fn delete_ipaddress(&mut self, id: IpaddressId) -> Result<Applied<Ipaddress>> {
        let row = self.ipaddress(id)?.clone();
        let owner = self.hosts.get(&row.host);
        let zone = owner.and_then(|h| h.zone);
        let mut affected =
            owner.map_or_else(AffectedZones::new, |h| self.glue_footprint(&h.name));
        affected.extend([zone, self.index.zones.reverse_zone_for(row.address)]);

        self.remove_ipaddress(id);
        tracing::info!(address = %row.address, "address removed");
        Ok(self.commit(row, affected))
    }

    /// Pin the PTR of `address` to `host`.
    pub fn set_ptr_override(&mut self, host: &str, address: IpAddr) -> Result<Applied<PtrOverride>> {
        let host = self.host(host)?.clone();
        if let Some(existing) = self.ptr_override_at(address) {
            return Err(RegistryError::Conflict(format!(
                "{address} already has a PTR override (row {})",
                existing.id
            )));
        }

        let ptr = PtrOverride {
            id: self.allocate(),
            host: host.id,
            address,
        };
        self.index.ptr_overrides.insert(address, ptr.id);
        self.ptr_overrides.insert(ptr.id, ptr.clone());
        self.saved(&ptr);
        tracing::info!(host = %host.name, %address, "ptr override set");

        let mut affected = AffectedZones::new();
        affected.insert_opt(self.index.zones.reverse_zone_for(address));
        Ok(self.commit(ptr, affected))
    }

    /// Drop the PTR override of `address`.
    pub fn delete_ptr_override(&mut self, address: IpAddr) -> Result<Applied<PtrOverride>> {
        let ptr = self
            .ptr_override_at(address)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("ptr override", address))?;
        self.remove_ptr_override(&ptr);

        let mut affected = AffectedZones::new();
        affected.insert_opt(self.index.zones.reverse_zone_for(address));
        Ok(self.commit(ptr, affected))
    }
}

#[cfg(test)]
mod tests {
    use crate::inventory::testing;
    use std::net::IpAddr;
    use zonereg_core::{
        ErrorKind, HostPatch, IpaddressPatch, MacAddress, NetworkAttrs, NewCname, NewHost, NewZone,
    };

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn mac(s: &str) -> Option<MacAddress> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn test_create_host_with_address() {
        let (mut inv, _) = testing::inventory();
        inv.create_zone(NewZone::new(
            "0.10.in-addr.arpa",
            ["ns1.example.org"],
            "hostmaster@example.org",
        ))
        .unwrap();
        testing::clean(&mut inv);

        let applied = inv
            .create_host(
                NewHost::new("www.example.org", "ops@example.org").with_ipaddress(ip("10.0.0.10")),
            )
            .unwrap();
        assert_eq!(applied.affected.len(), 2);
        assert!(inv.zone("0.10.in-addr.arpa").unwrap().updated);
        assert_eq!(inv.ipaddresses_of(applied.value.id).len(), 1);

        let err = inv
            .create_host(NewHost::new("WWW.example.org.", "ops@example.org"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_create_host_validation() {
        let (mut inv, _) = testing::inventory();
        let err = inv
            .create_host(NewHost::new("www.example.org", "ops@example.org").with_ttl(5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = inv
            .create_host(NewHost::new("www", "ops@example.org"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(inv.host("www.example.org").is_err());
    }

    #[test]
    fn test_unencodable_name_is_rejected_before_render() {
        let (mut inv, _) = testing::inventory();
        testing::clean(&mut inv);

        let err = inv
            .create_host(NewHost::new("a\u{5d0}.example.org", "ops@example.org"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!inv.zone("example.org").unwrap().updated);
        assert!(inv.render_zone("example.org").is_ok());

        testing::host(&mut inv, "b\u{fc}cher.example.org", "10.0.0.20");
        let text = inv.render_zone("example.org").unwrap();
        assert!(text.contains("xn--bcher-kva"));
    }

    #[test]
    fn test_comment_change_leaves_zone_clean() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "www.example.org", "10.0.0.10");
        testing::clean(&mut inv);

        let applied = inv
            .patch_host(
                "www.example.org",
                HostPatch {
                    comment: Some("rack 4".into()),
                    ..HostPatch::default()
                },
            )
            .unwrap();
        assert!(applied.affected.is_empty());
        assert!(!inv.zone("example.org").unwrap().updated);
    }

    #[test]
    fn test_rename_marks_old_and_new_zone() {
        let (mut inv, _) = testing::inventory();
        let com = inv
            .create_zone(NewZone::new(
                "example.com",
                ["ns1.example.org"],
                "hostmaster@example.org",
            ))
            .unwrap()
            .value;
        testing::host(&mut inv, "www.example.org", "10.0.0.10");
        testing::clean(&mut inv);

        let applied = inv
            .patch_host(
                "www.example.org",
                HostPatch {
                    name: Some("www.example.com".into()),
                    ..HostPatch::default()
                },
            )
            .unwrap();
        assert_eq!(applied.value.zone, Some(com.id));
        assert!(inv.zone("example.org").unwrap().updated);
        assert!(inv.zone("example.com").unwrap().updated);
        assert!(inv.host("www.example.org").is_err());
        assert!(inv.host("www.example.com").is_ok());
    }

    #[test]
    fn test_host_and_cname_names_are_exclusive() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "www.example.org", "10.0.0.10");
        inv.create_cname(NewCname {
            name: "web.example.org".into(),
            host: "www.example.org".into(),
            ttl: None,
        })
        .unwrap();
        let err = inv
            .create_host(NewHost::new("web.example.org", "ops@example.org"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_mac_uniqueness_per_vlan_and_family() {
        let (mut inv, _) = testing::inventory();
        let vlan = |v| NetworkAttrs {
            vlan: Some(v),
            ..NetworkAttrs::default()
        };
        inv.create_network("10.1.0.0/24".parse().unwrap(), vlan(10))
            .unwrap();
        inv.create_network("10.2.0.0/24".parse().unwrap(), vlan(10))
            .unwrap();
        inv.create_network("2001:db8::/64".parse().unwrap(), vlan(10))
            .unwrap();
        inv.create_network("10.3.0.0/24".parse().unwrap(), vlan(20))
            .unwrap();
        for name in ["a.example.org", "b.example.org", "c.example.org", "d.example.org"] {
            inv.create_host(NewHost::new(name, "ops@example.org")).unwrap();
        }

        let m = "aa:bb:cc:00:00:01";
        inv.add_ipaddress("a.example.org", ip("10.1.0.10"), mac(m))
            .unwrap();
        let err = inv
            .add_ipaddress("b.example.org", ip("10.2.0.10"), mac(m))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        inv.add_ipaddress("b.example.org", ip("2001:db8::10"), mac(m))
            .unwrap();
        inv.add_ipaddress("c.example.org", ip("10.3.0.10"), mac(m))
            .unwrap();
        inv.add_ipaddress("d.example.org", ip("192.0.2.1"), mac(m))
            .unwrap();
        assert!(inv
            .add_ipaddress("d.example.org", ip("198.51.100.1"), mac(m))
            .is_err());
    }

    #[test]
    fn test_patch_and_delete_ipaddress() {
        let (mut inv, _) = testing::inventory();
        let host = testing::host(&mut inv, "www.example.org", "10.0.0.10");
        let id = inv.ipaddresses_of(host.id)[0].id;

        let row = inv
            .patch_ipaddress(
                id,
                IpaddressPatch {
                    address: Some(ip("10.0.0.11")),
                    macaddress: Some(mac("aa:bb:cc:00:00:02")),
                },
            )
            .unwrap()
            .value;
        assert_eq!(row.address, ip("10.0.0.11"));
        assert!(inv.ipaddresses_at(ip("10.0.0.10")).is_empty());
        assert_eq!(inv.ipaddresses_at(ip("10.0.0.11")).len(), 1);

        inv.delete_ipaddress(id).unwrap();
        assert!(inv.ipaddresses_of(host.id).is_empty());
        assert_eq!(
            inv.delete_ipaddress(id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_ptr_override_is_unique() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "a.example.org", "10.0.0.5");
        testing::host(&mut inv, "b.example.org", "10.0.0.5");
        inv.set_ptr_override("a.example.org", ip("10.0.0.5"))
            .unwrap();
        let err = inv
            .set_ptr_override("b.example.org", ip("10.0.0.5"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        inv.delete_ptr_override(ip("10.0.0.5")).unwrap();
        inv.set_ptr_override("b.example.org", ip("10.0.0.5"))
            .unwrap();
    }

    #[test]
    fn test_delete_host_cascades() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "www.example.org", "10.0.0.10");
        inv.set_ptr_override("www.example.org", ip("10.0.0.10"))
            .unwrap();
        inv.create_cname(NewCname {
            name: "web.example.org".into(),
            host: "www.example.org".into(),
            ttl: None,
        })
        .unwrap();

        inv.delete_host("www.example.org").unwrap();
        assert!(inv.ipaddresses_at(ip("10.0.0.10")).is_empty());
        assert!(inv.ptr_override_at(ip("10.0.0.10")).is_none());
        assert!(inv.cname("web.example.org").is_err());
    }
}
