use ipnet::IpNet;
use std::collections::HashMap;
use std::net::IpAddr;
use zonereg_core::{Zone, ZoneId, ZoneKind};

/// Lookup structure mapping names to forward zones and addresses to
/// reverse zones. Rebuilt from the zone table, never persisted.
#[derive(Debug, Clone, Default)]
pub struct ZoneIndex {
    forward: HashMap<String, ZoneId>,
    reverse: Vec<(IpNet, ZoneId)>,
}

impl ZoneIndex {
    /// Index every zone.
    pub fn build<'a>(zones: impl IntoIterator<Item = &'a Zone>) -> Self {
        let mut index = Self::default();
        for zone in zones {
            index.insert(zone);
        }
        index
    }

    pub fn insert(&mut self, zone: &Zone) {
        match zone.kind.network() {
            None => {
                self.forward.insert(zone.name.clone(), zone.id);
            }
            Some(network) => self.reverse.push((network, zone.id)),
        }
    }

    pub fn remove(&mut self, zone: &Zone) {
        self.forward.remove(&zone.name);
        self.reverse.retain(|(_, id)| *id != zone.id);
    }

    /// Forward zone owning `name`: the longest zone name that `name` equals
    /// or ends with on a label boundary.
    pub fn forward_zone_for(&self, name: &str) -> Option<ZoneId> {
        let mut candidate = name;
        loop {
            if let Some(id) = self.forward.get(candidate) {
                return Some(*id);
            }
            candidate = candidate.split_once('.')?.1;
        }
    }

    /// Most specific reverse zone covering `addr`.
    pub fn reverse_zone_for(&self, addr: IpAddr) -> Option<ZoneId> {
        self.reverse
            .iter()
            .filter(|(net, _)| net.contains(&addr))
            .max_by_key(|(net, _)| net.prefix_len())
            .map(|(_, id)| *id)
    }

    /// Reverse zone ranges strictly inside `network`.
    pub fn reverse_ranges_within(&self, network: &IpNet) -> Vec<IpNet> {
        self.reverse
            .iter()
            .map(|(net, _)| *net)
            .filter(|net| net.prefix_len() > network.prefix_len() && network.contains(net))
            .collect()
    }

    /// Most specific reverse zone covering the whole of `network`, other
    /// than a zone for exactly that range.
    pub fn reverse_parent_of(&self, kind: &ZoneKind) -> Option<ZoneId> {
        let network = kind.network()?;
        self.reverse
            .iter()
            .filter(|(net, _)| net.prefix_len() < network.prefix_len() && net.contains(&network))
            .max_by_key(|(net, _)| net.prefix_len())
            .map(|(_, id)| *id)
    }
}
