use ipnet::IpNet;
use std::net::IpAddr;
use zonereg_core::{Network, NetworkAttrs, NetworkId, NetworkPatch, RegistryError, Result};

use super::Inventory;
use crate::address::{self, range_size, AddressSpace};

/// Networks this small get a smaller default reserved count.
const TINY_NETWORK_SIZE: u128 = 4;

fn check_canonical(range: &IpNet) -> Result<()> {
    if range.trunc() == *range {
        Ok(())
    } else {
        Err(RegistryError::invalid(
            "range",
            format!("{range} has host bits set; did you mean {}?", range.trunc()),
        ))
    }
}

impl Inventory {
    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    /// Network by its range.
    pub fn network(&self, range: &IpNet) -> Result<&Network> {
        self.networks
            .values()
            .find(|n| n.range == *range)
            .ok_or_else(|| RegistryError::not_found("network", range))
    }

    /// The network containing `addr`, if any.
    pub fn network_by_ip(&self, addr: IpAddr) -> Option<&Network> {
        self.networks.values().find(|n| n.range.contains(&addr))
    }

    /// Networks intersecting `candidate`.
    pub fn overlapping(&self, candidate: &IpNet, excluding: Option<NetworkId>) -> Vec<&Network> {
        address::overlapping(self.networks.values(), candidate, excluding)
    }

    fn check_no_overlap(&self, candidate: &IpNet, excluding: Option<NetworkId>) -> Result<()> {
        let hits = self.overlapping(candidate, excluding);
        if hits.is_empty() {
            return Ok(());
        }
        let ranges: Vec<String> = hits.iter().map(|n| n.range.to_string()).collect();
        Err(RegistryError::Conflict(format!(
            "{candidate} overlaps with: {}",
            ranges.join(", ")
        )))
    }

    /// Reserved count for a new network of `range` when none is given.
    fn default_reserved(&self, range: &IpNet) -> u32 {
        let size = range_size(range);
        if size <= TINY_NETWORK_SIZE {
            // size is at most 4 here
            u32::try_from(size.min(2)).unwrap_or(2)
        } else {
            self.config.network.reserved
        }
    }

    /// Allocation view of a network.
    pub fn address_space(&self, range: &IpNet) -> Result<AddressSpace> {
        let network = self.network(range)?;
        Ok(AddressSpace::new(
            network.range,
            network.reserved,
            self.addresses_in(&network.range),
            self.config.network.unused_cap,
        ))
    }

    /// Create a network. Overlap with an existing range is a conflict.
    pub fn create_network(&mut self, range: IpNet, attrs: NetworkAttrs) -> Result<Network> {
        check_canonical(&range)?;
        self.check_no_overlap(&range, None)?;

        let reserved = attrs
            .reserved
            .unwrap_or_else(|| self.default_reserved(&range));
        let network = Network {
            id: self.allocate(),
            range,
            description: attrs.description,
            vlan: attrs.vlan,
            category: attrs.category,
            location: attrs.location,
            frozen: attrs.frozen.unwrap_or(false),
            dns_delegated: attrs.dns_delegated.unwrap_or(false),
            reserved,
        };
        self.networks.insert(network.id, network.clone());
        self.saved(&network);
        tracing::info!(range = %network.range, reserved, "network created");
        Ok(network)
    }

    /// Patch a network. A new range is re-checked for overlaps against every
    /// other network and must still contain all addresses in use.
    pub fn patch_network(&mut self, range: &IpNet, patch: NetworkPatch) -> Result<Network> {
        let current = self.network(range)?.clone();

        if let Some(new_range) = patch.range {
            check_canonical(&new_range)?;
            self.check_no_overlap(&new_range, Some(current.id))?;
            let stranded: Vec<String> = self
                .addresses_in(&current.range)
                .into_iter()
                .filter(|a| !new_range.contains(a))
                .map(|a| a.to_string())
                .collect();
            if !stranded.is_empty() {
                return Err(RegistryError::Conflict(format!(
                    "addresses in use outside {new_range}: {}",
                    stranded.join(", ")
                )));
            }
        }

        let attrs = patch.attrs;
        let mut network = current;
        if let Some(new_range) = patch.range {
            network.range = new_range;
        }
        if attrs.description.is_some() {
            network.description = attrs.description;
        }
        if attrs.vlan.is_some() {
            network.vlan = attrs.vlan;
        }
        if attrs.category.is_some() {
            network.category = attrs.category;
        }
        if attrs.location.is_some() {
            network.location = attrs.location;
        }
        if let Some(frozen) = attrs.frozen {
            network.frozen = frozen;
        }
        if let Some(dns_delegated) = attrs.dns_delegated {
            network.dns_delegated = dns_delegated;
        }
        if let Some(reserved) = attrs.reserved {
            network.reserved = reserved;
        }

        self.networks.insert(network.id, network.clone());
        self.saved(&network);
        tracing::info!(range = %network.range, "network updated");
        Ok(network)
    }

    /// Delete a network that has no addresses in use.
    pub fn delete_network(&mut self, range: &IpNet) -> Result<Network> {
        let network = self.network(range)?.clone();
        let used = self.addresses_in(&network.range);
        if !used.is_empty() {
            return Err(RegistryError::Conflict(format!(
                "network {} has {} address(es) in use",
                network.range,
                used.len()
            )));
        }
        self.networks.remove(&network.id);
        self.deleted(&network);
        tracing::info!(range = %network.range, "network deleted");
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use crate::inventory::testing;
    use std::net::IpAddr;
    use zonereg_core::{ErrorKind, NetworkAttrs, NetworkPatch};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_create_rejects_overlap() {
        let (mut inv, _) = testing::inventory();
        inv.create_network("10.0.1.0/28".parse().unwrap(), NetworkAttrs::default())
            .unwrap();
        let before = inv.networks().count();

        let err = inv
            .create_network("10.0.1.0/29".parse().unwrap(), NetworkAttrs::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(inv.networks().count(), before);
    }

    #[test]
    fn test_create_rejects_host_bits() {
        let (mut inv, _) = testing::inventory();
        let err = inv
            .create_network("10.0.5.1/24".parse().unwrap(), NetworkAttrs::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_tiny_network_reserved_default() {
        let (mut inv, _) = testing::inventory();
        let slash30 = inv
            .create_network("10.0.9.0/30".parse().unwrap(), NetworkAttrs::default())
            .unwrap();
        assert_eq!(slash30.reserved, 2);
        let slash32 = inv
            .create_network("10.0.9.8/32".parse().unwrap(), NetworkAttrs::default())
            .unwrap();
        assert_eq!(slash32.reserved, 1);
        let space = inv.address_space(&slash32.range).unwrap();
        assert_eq!(space.reserved_addresses().len(), 1);
    }

    #[test]
    fn test_patch_range_excludes_itself() {
        let (mut inv, _) = testing::inventory();
        let range = "10.0.0.0/24".parse().unwrap();
        let patched = inv
            .patch_network(
                &range,
                NetworkPatch {
                    range: Some("10.0.0.0/23".parse().unwrap()),
                    ..NetworkPatch::default()
                },
            )
            .unwrap();
        assert_eq!(patched.range.to_string(), "10.0.0.0/23");
        assert_eq!(patched.reserved, 3);
    }

    #[test]
    fn test_patch_cannot_strand_addresses() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "www.example.org", "10.0.0.200");
        let err = inv
            .patch_network(
                &"10.0.0.0/24".parse().unwrap(),
                NetworkPatch {
                    range: Some("10.0.0.0/25".parse().unwrap()),
                    ..NetworkPatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_delete_requires_unused_network() {
        let (mut inv, _) = testing::inventory();
        let range = "10.0.0.0/24".parse().unwrap();
        testing::host(&mut inv, "www.example.org", "10.0.0.17");
        assert_eq!(
            inv.delete_network(&range).unwrap_err().kind(),
            ErrorKind::Conflict
        );

        inv.delete_host("www.example.org").unwrap();
        inv.delete_network(&range).unwrap();
        assert!(inv.network_by_ip(ip("10.0.0.17")).is_none());
    }

    #[test]
    fn test_by_ip_and_usage() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "www.example.org", "10.0.0.17");
        let network = inv.network_by_ip(ip("10.0.0.17")).unwrap();
        assert_eq!(network.range.to_string(), "10.0.0.0/24");

        let space = inv.address_space(&network.range).unwrap();
        assert_eq!(space.used_count(), 1);
        assert_eq!(space.unused_count(), 250);
        assert_eq!(space.first_unused(), Some(ip("10.0.0.4")));
    }
}
