use ipnet::IpNet;
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use zonereg_core::{
    Delegation, Host, HostId, Mx, NameServer, NameServerId, Naptr, RegistryError, Result, Sshfp,
    Txt, Zone, ZoneKind,
};

use super::line::{encode_email, encode_name, qualify, quoted, RecordKind, RecordLine, SoaBlock};
use crate::address::{to_u128, Family};
use crate::inventory::Inventory;
use crate::zones::{is_within, parse_zone_kind, ptr_owner};

/// A rendered zone: SOA block followed by one line per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneFile {
    pub soa: SoaBlock,
    pub records: Vec<RecordLine>,
}

impl fmt::Display for ZoneFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.soa)?;
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}

struct Renderer<'a> {
    inv: &'a Inventory,
    zone: &'a Zone,
    origin: String,
    records: Vec<RecordLine>,
}

impl<'a> Renderer<'a> {
    fn fail(&self, reason: impl Into<String>) -> RegistryError {
        RegistryError::Render {
            zone: self.zone.name.clone(),
            reason: reason.into(),
        }
    }

    /// `name` encoded and written relative to the zone.
    fn name(&self, name: &str) -> Result<String> {
        Ok(qualify(&encode_name(&self.zone.name, name)?, &self.origin))
    }

    fn host(&self, id: HostId) -> Result<&'a Host> {
        let inv = self.inv;
        inv.host_by_id(id)
            .ok_or_else(|| self.fail(format!("host {id} is missing")))
    }

    /// Nameserver rows for `ids`, ordered by name.
    fn nameservers(&self, ids: &BTreeSet<NameServerId>) -> Result<Vec<&'a NameServer>> {
        let inv = self.inv;
        let mut servers = ids
            .iter()
            .map(|id| {
                inv.nameserver(*id)
                    .ok_or_else(|| self.fail(format!("nameserver {id} is missing")))
            })
            .collect::<Result<Vec<_>>>()?;
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(servers)
    }

    fn push(&mut self, owner: String, ttl: Option<u32>, kind: RecordKind, data: String) {
        self.records.push(RecordLine::new(owner, ttl, kind, data));
    }

    fn zone_nameservers(&mut self) -> Result<()> {
        for ns in self.nameservers(&self.zone.nameservers)? {
            let data = self.name(&ns.name)?;
            self.push(String::new(), ns.ttl, RecordKind::Ns, data);
        }
        Ok(())
    }

    fn delegation(&mut self, delegation: &Delegation) -> Result<()> {
        let owner = self.name(&delegation.name)?;
        let servers = self.nameservers(&delegation.nameservers)?;
        for ns in &servers {
            let data = self.name(&ns.name)?;
            self.push(owner.clone(), ns.ttl, RecordKind::Ns, data);
        }

        // Glue for nameservers inside the delegated subtree, unless the
        // host's own records already land in this zone.
        let inv = self.inv;
        for ns in servers.iter().filter(|ns| is_within(&ns.name, &delegation.name)) {
            let Ok(host) = inv.host(&ns.name) else {
                tracing::debug!(zone = %self.zone.name, nameserver = %ns.name, "no host for glue");
                continue;
            };
            if host.zone == Some(self.zone.id) {
                continue;
            }
            let glue_owner = self.name(&ns.name)?;
            for addr in inv.ipaddresses_of(host.id) {
                self.push(
                    glue_owner.clone(),
                    host.ttl,
                    RecordKind::address(&addr.address),
                    addr.address.to_string(),
                );
            }
        }

        let parent_is_v4_reverse = matches!(
            self.zone.kind,
            ZoneKind::Reverse {
                network: IpNet::V4(_)
            }
        );
        if let (true, Ok(ZoneKind::Classless { network })) = (
            parent_is_v4_reverse,
            parse_zone_kind("name", &delegation.name),
        ) {
            let kind = ZoneKind::Classless { network };
            let first = to_u128(IpAddr::V4(network.network()));
            let last = to_u128(IpAddr::V4(network.broadcast()));
            for value in first..=last {
                let addr = Family::V4.addr(value);
                let octet = ptr_owner(addr, &delegation.name, &kind);
                let owner = ptr_owner(addr, &self.zone.name, &self.zone.kind);
                let data = self.name(&format!("{octet}.{}", delegation.name))?;
                self.push(owner, None, RecordKind::Cname, data);
            }
        }
        Ok(())
    }

    fn host_records(&mut self, host: &Host) -> Result<()> {
        let inv = self.inv;
        let owner = self.name(&host.name)?;
        let ttl = host.ttl;

        if let Some(id) = host.hinfo {
            let preset = inv
                .hinfo_preset(id)
                .map_err(|_| self.fail(format!("hinfo preset {id} of {} is missing", host.name)))?;
            let data = format!("{} {}", quoted(&preset.cpu), quoted(&preset.os));
            self.push(owner.clone(), ttl, RecordKind::Hinfo, data);
        }
        if let Some(loc) = &host.loc {
            self.push(owner.clone(), ttl, RecordKind::Loc, loc.clone());
        }
        for addr in inv.ipaddresses_of(host.id) {
            self.push(
                owner.clone(),
                ttl,
                RecordKind::address(&addr.address),
                addr.address.to_string(),
            );
        }
        for mx in inv.records_of::<Mx>(host.id) {
            let data = format!("{} {}", mx.priority, self.name(&mx.mx)?);
            self.push(owner.clone(), ttl, RecordKind::Mx, data);
        }
        for txt in inv.records_of::<Txt>(host.id) {
            self.push(owner.clone(), ttl, RecordKind::Txt, quoted(&txt.txt));
        }
        for naptr in inv.records_of::<Naptr>(host.id) {
            let data = format!(
                "{} {} {} {} {} {}",
                naptr.order,
                naptr.preference,
                quoted(&naptr.flag),
                quoted(&naptr.service),
                quoted(&naptr.regex),
                self.name(&naptr.replacement)?
            );
            self.push(owner.clone(), ttl, RecordKind::Naptr, data);
        }
        for sshfp in inv.records_of::<Sshfp>(host.id) {
            let data = format!(
                "{} {} {}",
                sshfp.algorithm, sshfp.hash_type, sshfp.fingerprint
            );
            self.push(owner.clone(), ttl, RecordKind::Sshfp, data);
        }
        Ok(())
    }

    fn cnames(&mut self) -> Result<()> {
        let inv = self.inv;
        for cname in inv.cnames_in_zone(self.zone.id) {
            let target = self.host(cname.host)?;
            let owner = self.name(&cname.name)?;
            let data = self.name(&target.name)?;
            self.push(owner, cname.ttl, RecordKind::Cname, data);
        }
        Ok(())
    }

    fn srvs(&mut self) -> Result<()> {
        let inv = self.inv;
        for srv in inv.srvs_in_zone(self.zone.id) {
            let target = self.host(srv.host)?;
            let owner = self.name(&srv.name)?;
            let data = format!(
                "{} {} {} {}",
                srv.priority,
                srv.weight,
                srv.port,
                self.name(&target.name)?
            );
            self.push(owner, srv.ttl, RecordKind::Srv, data);
        }
        Ok(())
    }

    /// Ranges inside this reverse zone that are served elsewhere: more
    /// specific reverse zones and delegated subtrees.
    fn excluded_ranges(&self, network: &IpNet) -> Vec<IpNet> {
        let mut ranges = self.inv.zone_index().reverse_ranges_within(network);
        ranges.extend(
            self.inv
                .delegations_of(self.zone.id)
                .iter()
                .filter_map(|d| parse_zone_kind("name", &d.name).ok())
                .filter_map(|kind| kind.network()),
        );
        ranges
    }

    fn pointers(&mut self, network: &IpNet) -> Result<()> {
        let inv = self.inv;
        let excluded = self.excluded_ranges(network);
        let addresses: BTreeSet<IpAddr> = inv
            .addresses_in(network)
            .into_iter()
            .chain(inv.ptr_overrides_in(network).iter().map(|p| p.address))
            .filter(|a| !excluded.iter().any(|r| r.contains(a)))
            .collect();

        for addr in addresses {
            let host = if let Some(ptr) = inv.ptr_override_at(addr) {
                self.host(ptr.host)?
            } else {
                let rows = inv.ipaddresses_at(addr);
                match rows.as_slice() {
                    [only] => self.host(only.host)?,
                    _ => {
                        tracing::debug!(
                            zone = %self.zone.name,
                            address = %addr,
                            hosts = rows.len(),
                            "ambiguous address without ptr override, skipped"
                        );
                        continue;
                    }
                }
            };
            let owner = ptr_owner(addr, &self.origin, &self.zone.kind);
            let data = self.name(&host.name)?;
            self.push(owner, host.ttl, RecordKind::Ptr, data);
        }
        Ok(())
    }
}

/// Render `zone` from the inventory. The zone's serial must already be
/// current; the inventory is only read.
pub fn render_zone(inv: &Inventory, zone: &Zone) -> Result<String> {
    build_zone_file(inv, zone).map(|file| file.to_string())
}

/// Assemble the lines of a zone file in their fixed order.
pub fn build_zone_file(inv: &Inventory, zone: &Zone) -> Result<ZoneFile> {
    let origin = encode_name(&zone.name, &zone.name)?;
    let mut r = Renderer {
        inv,
        zone,
        origin,
        records: Vec::new(),
    };

    let mname = encode_name(&zone.name, &zone.primary_ns)?;
    let soa = SoaBlock {
        origin: r.origin.clone(),
        mname: format!("{mname}."),
        rname: encode_email(&zone.name, &zone.email)?,
        serial: zone.serialno,
        refresh: zone.refresh,
        retry: zone.retry,
        expire: zone.expire,
        ttl: zone.ttl,
    };

    r.zone_nameservers()?;
    for delegation in inv.delegations_of(zone.id) {
        r.delegation(delegation)?;
    }
    for host in inv.hosts_in_zone(zone.id) {
        r.host_records(host)?;
    }
    r.cnames()?;
    r.srvs()?;
    if let Some(network) = zone.kind.network() {
        r.pointers(&network)?;
    }

    tracing::debug!(zone = %zone.name, records = r.records.len(), "zone rendered");
    Ok(ZoneFile {
        soa,
        records: r.records,
    })
}

#[cfg(test)]
mod tests {
    use crate::inventory::testing;
    use std::net::IpAddr;
    use zonereg_core::{
        HostPatch, Mx, NewCname, NewDelegation, NewHinfoPreset, NewHost, NewMx, NewSrv, NewTxt,
        NewZone, Txt,
    };

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn body(text: &str) -> Vec<&str> {
        text.lines().skip(8).collect()
    }

    fn reverse_zone(inv: &mut crate::Inventory, name: &str) {
        inv.create_zone(NewZone::new(name, ["ns1.example.org"], "hostmaster@example.org"))
            .unwrap();
    }

    #[test]
    fn test_forward_zone_layout() {
        let (mut inv, _) = testing::inventory();
        let preset = inv
            .create_hinfo_preset(NewHinfoPreset {
                cpu: "x86_64".into(),
                os: "Linux".into(),
            })
            .unwrap();
        inv.create_host(NewHost {
            hinfo: Some(preset.id),
            ttl: Some(3600),
            ..NewHost::new("www.example.org", "ops@example.org").with_ipaddress(ip("10.0.0.10"))
        })
        .unwrap();
        inv.add_ipaddress("www.example.org", ip("2001:db8::10"), None)
            .unwrap();
        inv.create_record::<Mx>(NewMx {
            host: "www.example.org".into(),
            priority: 10,
            mx: "mail.example.net".into(),
        })
        .unwrap();
        inv.create_record::<Txt>(NewTxt {
            host: "www.example.org".into(),
            txt: "hello".into(),
        })
        .unwrap();
        inv.create_cname(NewCname {
            name: "web.example.org".into(),
            host: "www.example.org".into(),
            ttl: None,
        })
        .unwrap();
        inv.create_srv(NewSrv {
            name: "_http._tcp.example.org".into(),
            priority: 0,
            weight: 5,
            port: 80,
            ttl: None,
            host: "www.example.org".into(),
        })
        .unwrap();

        let text = inv.render_zone("example.org").unwrap();
        let serial = inv.zone("example.org").unwrap().serialno;
        assert!(text.starts_with("$ORIGIN example.org.\n$TTL 43200\n"));
        assert!(text.contains(&format!("{serial}  ; Serialnumber")));
        assert!(text.contains("IN SOA    ns1.example.org. hostmaster.example.org. ("));
        assert_eq!(
            body(&text),
            vec![
                "                               IN NS     ns1",
                "                               IN NS     ns2.example.net.",
                "www                      3600  IN HINFO  \"x86_64\" \"Linux\"",
                "www                      3600  IN A      10.0.0.10",
                "www                      3600  IN AAAA   2001:db8::10",
                "www                      3600  IN MX     10 mail.example.net.",
                "www                      3600  IN TXT    \"hello\"",
                "web                            IN CNAME  www",
                "_http._tcp                     IN SRV    0 5 80 www",
            ]
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_ambiguous_ptr_needs_override() {
        let (mut inv, _) = testing::inventory();
        reverse_zone(&mut inv, "0.0.10.in-addr.arpa");
        testing::host(&mut inv, "a.example.org", "10.0.0.5");
        testing::host(&mut inv, "b.example.org", "10.0.0.5");
        testing::host(&mut inv, "c.example.org", "10.0.0.6");

        let text = inv.render_zone("0.0.10.in-addr.arpa").unwrap();
        assert!(!text.contains("\n5 "));
        assert!(text.contains("6                              IN PTR    c.example.org."));

        inv.set_ptr_override("b.example.org", ip("10.0.0.5"))
            .unwrap();
        let text = inv.render_zone("0.0.10.in-addr.arpa").unwrap();
        assert_eq!(text.matches("IN PTR    b.example.org.").count(), 1);
        assert!(!text.contains("a.example.org."));
    }

    #[test]
    fn test_override_only_address_gets_ptr() {
        let (mut inv, _) = testing::inventory();
        reverse_zone(&mut inv, "10.in-addr.arpa");
        testing::host(&mut inv, "www.example.org", "10.0.0.10");
        inv.set_ptr_override("www.example.org", ip("10.1.2.3"))
            .unwrap();

        let text = inv.render_zone("10.in-addr.arpa").unwrap();
        assert!(text.contains("3.2.1                          IN PTR    www.example.org."));
        assert!(text.contains("10.0.0                         IN PTR    www.example.org."));
    }

    #[test]
    fn test_more_specific_reverse_zone_takes_addresses() {
        let (mut inv, _) = testing::inventory();
        reverse_zone(&mut inv, "10.in-addr.arpa");
        reverse_zone(&mut inv, "0.0.10.in-addr.arpa");
        testing::host(&mut inv, "www.example.org", "10.0.0.10");

        let wide = inv.render_zone("10.in-addr.arpa").unwrap();
        assert!(!wide.contains("PTR"));
        let narrow = inv.render_zone("0.0.10.in-addr.arpa").unwrap();
        assert!(narrow.contains("10                             IN PTR    www.example.org."));
    }

    #[test]
    fn test_classless_delegation_and_zone() {
        let (mut inv, _) = testing::inventory();
        reverse_zone(&mut inv, "0.0.10.in-addr.arpa");
        inv.add_delegation(
            "0.0.10.in-addr.arpa",
            NewDelegation {
                name: "128/30.0.0.10.in-addr.arpa".into(),
                nameservers: vec!["ns.customer.example".into()],
                comment: None,
            },
        )
        .unwrap();
        testing::host(&mut inv, "www.example.org", "10.0.0.129");

        let parent = inv.render_zone("0.0.10.in-addr.arpa").unwrap();
        assert!(parent.contains("128/30                         IN NS     ns.customer.example."));
        for octet in 128..=131 {
            assert!(parent.contains(&format!(
                "{octet:<24}       IN CNAME  {octet}.128/30\n"
            )));
        }
        assert!(!parent.contains("PTR"));

        reverse_zone(&mut inv, "128/30.0.0.10.in-addr.arpa");
        let child = inv.render_zone("128/30.0.0.10.in-addr.arpa").unwrap();
        assert!(child.contains("129                            IN PTR    www.example.org."));
    }

    #[test]
    fn test_glue_for_in_bailiwick_nameservers() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "ns.sub.example.org", "10.0.0.53");
        inv.add_delegation(
            "example.org",
            NewDelegation {
                name: "sub.example.org".into(),
                nameservers: vec!["ns.sub.example.org".into(), "ns.example.net".into()],
                comment: None,
            },
        )
        .unwrap();

        let glue = "ns.sub                         IN A      10.0.0.53";
        let text = inv.render_zone("example.org").unwrap();
        assert!(text.contains("sub                            IN NS     ns.sub\n"));
        assert!(text.contains("sub                            IN NS     ns.example.net.\n"));
        assert_eq!(text.matches(glue).count(), 1);

        inv.create_zone(NewZone::new(
            "sub.example.org",
            ["ns.sub.example.org"],
            "hostmaster@example.org",
        ))
        .unwrap();
        let text = inv.render_zone("example.org").unwrap();
        assert_eq!(text.matches(glue).count(), 1);
        assert!(!text.contains("ns.sub.example.org."));
    }

    #[test]
    fn test_glue_changes_dirty_the_parent_zone() {
        let (mut inv, _) = testing::inventory();
        inv.add_delegation(
            "example.org",
            NewDelegation {
                name: "sub.example.org".into(),
                nameservers: vec!["ns.sub.example.org".into()],
                comment: None,
            },
        )
        .unwrap();
        inv.create_zone(NewZone::new(
            "sub.example.org",
            ["ns.sub.example.org"],
            "hostmaster@example.org",
        ))
        .unwrap();
        testing::host(&mut inv, "ns.sub.example.org", "10.0.0.53");
        testing::clean(&mut inv);
        let serial = inv.zone("example.org").unwrap().serialno;

        let applied = inv
            .add_ipaddress("ns.sub.example.org", ip("10.9.9.53"), None)
            .unwrap();
        let parent = inv.zone("example.org").unwrap();
        assert!(applied.affected.contains(parent.id));
        assert!(parent.updated);

        let text = inv.render_zone("example.org").unwrap();
        assert!(text.contains("ns.sub                         IN A      10.9.9.53"));
        let serial = {
            let next = inv.zone("example.org").unwrap().serialno;
            assert!(next > serial);
            next
        };

        let row = applied.value.id;
        inv.delete_ipaddress(row).unwrap();
        assert!(inv.zone("example.org").unwrap().updated);
        let text = inv.render_zone("example.org").unwrap();
        assert!(!text.contains("10.9.9.53"));
        assert!(inv.zone("example.org").unwrap().serialno > serial);

        inv.patch_host(
            "ns.sub.example.org",
            HostPatch {
                ttl: Some(600),
                ..HostPatch::default()
            },
        )
        .unwrap();
        assert!(inv.zone("example.org").unwrap().updated);
    }

    #[test]
    fn test_missing_hinfo_preset_is_a_render_error() {
        let (mut inv, _) = testing::inventory();
        let preset = inv
            .create_hinfo_preset(NewHinfoPreset {
                cpu: "arm".into(),
                os: "bsd".into(),
            })
            .unwrap();
        testing::host(&mut inv, "www.example.org", "10.0.0.10");
        inv.patch_host(
            "www.example.org",
            HostPatch {
                hinfo: Some(preset.id),
                ..HostPatch::default()
            },
        )
        .unwrap();
        let mut snapshot = inv.snapshot();
        snapshot.hinfo_presets.clear();
        let mut broken = crate::Inventory::from_snapshot(
            inv.config().clone(),
            std::sync::Arc::new(crate::clock::SystemClock),
            snapshot,
        )
        .unwrap();
        let serial = broken.zone("example.org").unwrap().serialno;

        let err = broken.render_zone("example.org").unwrap_err();
        assert_eq!(err.kind(), zonereg_core::ErrorKind::Internal);
        assert_eq!(broken.zone("example.org").unwrap().serialno, serial);
        assert!(broken.zone("example.org").unwrap().updated);
    }
}
