use ipnet::IpNet;
use zonereg_core::DhcpHost;

use super::Inventory;
use crate::address::Family;

impl Inventory {
    /// DHCP bindings for every address that carries a MAC, ordered by
    /// address then host name. Optionally limited to a range or a family.
    pub fn dhcp_hosts(&self, range: Option<&IpNet>, family: Option<Family>) -> Vec<DhcpHost> {
        let mut bindings: Vec<DhcpHost> = self
            .ipaddresses
            .values()
            .filter(|a| range.map_or(true, |r| r.contains(&a.address)))
            .filter(|a| family.map_or(true, |f| Family::of(&a.address) == f))
            .filter_map(|a| {
                let mac = a.macaddress.clone()?;
                let host = self.hosts.get(&a.host)?;
                Some(DhcpHost {
                    host: host.name.clone(),
                    address: a.address,
                    macaddress: mac,
                })
            })
            .collect();
        bindings.sort_by(|a, b| (a.address, &a.host).cmp(&(b.address, &b.host)));
        bindings
    }
}
