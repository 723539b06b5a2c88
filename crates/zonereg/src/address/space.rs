use ipnet::IpNet;
use std::collections::BTreeSet;
use std::net::IpAddr;
use zonereg_core::{Network, NetworkId};

use super::family::{to_u128, Family};

/// Returns true if two ranges share at least one address.
///
/// CIDR blocks either nest or are disjoint, so it is enough to check whether
/// one contains the other's network address.
#[must_use]
pub fn ranges_overlap(a: &IpNet, b: &IpNet) -> bool {
    Family::of_net(a) == Family::of_net(b)
        && (a.contains(&b.network()) || b.contains(&a.network()))
}

/// Every network intersecting `candidate`, optionally ignoring one network.
pub fn overlapping<'a>(
    networks: impl IntoIterator<Item = &'a Network>,
    candidate: &IpNet,
    excluding: Option<NetworkId>,
) -> Vec<&'a Network> {
    networks
        .into_iter()
        .filter(|n| Some(n.id) != excluding && ranges_overlap(&n.range, candidate))
        .collect()
}

/// Number of addresses in a range, saturating for `::/0`.
#[must_use]
pub fn range_size(range: &IpNet) -> u128 {
    let host_bits = u32::from(range.max_prefix_len() - range.prefix_len());
    1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
}

/// Allocation view of one network: its range, reserved count and the
/// addresses in use inside it.
#[derive(Debug, Clone)]
pub struct AddressSpace {
    range: IpNet,
    family: Family,
    reserved: u32,
    used: Vec<IpAddr>,
    unused_cap: u32,
}

impl AddressSpace {
    /// Build the view. `used` may contain duplicates and addresses outside
    /// the range; only distinct in-range addresses are kept.
    pub fn new(
        range: IpNet,
        reserved: u32,
        used: impl IntoIterator<Item = IpAddr>,
        unused_cap: u32,
    ) -> Self {
        let range = range.trunc();
        let mut used: Vec<IpAddr> = used.into_iter().filter(|a| range.contains(a)).collect();
        used.sort_unstable();
        used.dedup();
        Self {
            family: Family::of_net(&range),
            range,
            reserved,
            used,
            unused_cap,
        }
    }

    /// The network's range.
    pub const fn range(&self) -> &IpNet {
        &self.range
    }

    pub const fn family(&self) -> Family {
        self.family
    }

    /// Total number of addresses in the range.
    pub fn size(&self) -> u128 {
        range_size(&self.range)
    }

    fn first(&self) -> u128 {
        to_u128(self.range.network())
    }

    fn last(&self) -> u128 {
        to_u128(self.range.broadcast())
    }

    /// Inclusive bounds of the host-usable addresses.
    ///
    /// IPv4 excludes the network and broadcast addresses except on /31 and
    /// /32 point-to-point ranges. IPv6 excludes the subnet-router anycast
    /// address except on /127 and /128.
    fn host_bounds(&self) -> Option<(u128, u128)> {
        let (first, last) = (self.first(), self.last());
        let host_bits = self.family.bits() - self.range.prefix_len();
        match (self.family, host_bits) {
            (_, 0 | 1) => Some((first, last)),
            (Family::V4, _) => Some((first + 1, last - 1)),
            (Family::V6, _) => Some((first + 1, last)),
        }
    }

    /// Window scanned for unused addresses: every host address, or only the
    /// first `unused_cap` of them when the family bounds enumeration.
    fn unused_window(&self) -> Option<(u128, u128)> {
        let (first, last) = self.host_bounds()?;
        if self.family.bounds_enumeration() {
            let cap = u128::from(self.unused_cap);
            if cap == 0 {
                return None;
            }
            Some((first, last.min(first.saturating_add(cap - 1))))
        } else {
            Some((first, last))
        }
    }

    fn reserved_values(&self) -> BTreeSet<u128> {
        let mut reserved = BTreeSet::from([self.first()]);
        if let Some((first, last)) = self.host_bounds() {
            let count = u128::from(self.reserved).min(last - first + 1);
            reserved.extend((0..count).map(|i| first + i));
        }
        if self.family.has_broadcast() {
            reserved.insert(self.last());
        }
        reserved
    }

    /// Network address, the first `reserved` host addresses and, where the
    /// family has one, the broadcast address.
    pub fn reserved_addresses(&self) -> BTreeSet<IpAddr> {
        self.reserved_values()
            .into_iter()
            .map(|v| self.family.addr(v))
            .collect()
    }

    /// Distinct addresses in use, ascending.
    pub fn used_addresses(&self) -> &[IpAddr] {
        &self.used
    }

    pub fn used_count(&self) -> u64 {
        self.used.len() as u64
    }

    /// Unused addresses in ascending order, lazily.
    pub fn unused(&self) -> impl Iterator<Item = IpAddr> + '_ {
        let mut taken = self.reserved_values();
        taken.extend(self.used.iter().map(|a| to_u128(*a)));
        let window = self.unused_window();
        let family = self.family;
        window
            .into_iter()
            .flat_map(|(first, last)| first..=last)
            .filter(move |v| !taken.contains(v))
            .map(move |v| family.addr(v))
    }

    /// The unused set, bounded as described on [`Family::bounds_enumeration`].
    pub fn unused_addresses(&self) -> BTreeSet<IpAddr> {
        self.unused().collect()
    }

    /// Cardinality of [`Self::unused_addresses`], computed without
    /// enumerating the window.
    pub fn unused_count(&self) -> u64 {
        let Some((first, last)) = self.unused_window() else {
            return 0;
        };
        let mut taken = self.reserved_values();
        taken.extend(self.used.iter().map(|a| to_u128(*a)));
        let taken_in_window = taken.range(first..=last).count() as u128;
        let free = (last - first + 1).saturating_sub(taken_in_window);
        u64::try_from(free).unwrap_or(u64::MAX)
    }

    /// Lowest unused address.
    pub fn first_unused(&self) -> Option<IpAddr> {
        self.unused().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    fn network(id: u64, range: &str) -> Network {
        Network {
            id: NetworkId(id),
            range: net(range),
            description: None,
            vlan: None,
            category: None,
            location: None,
            frozen: false,
            dns_delegated: false,
            reserved: 3,
        }
    }

    #[test]
    fn test_ipv4_slash24() {
        let space = AddressSpace::new(net("10.0.0.0/24"), 3, [ip("10.0.0.17")], 4000);
        let reserved: Vec<IpAddr> = space.reserved_addresses().into_iter().collect();
        assert_eq!(
            reserved,
            vec![
                ip("10.0.0.0"),
                ip("10.0.0.1"),
                ip("10.0.0.2"),
                ip("10.0.0.3"),
                ip("10.0.0.255")
            ]
        );
        assert_eq!(space.used_count(), 1);
        assert_eq!(space.unused_count(), 250);
        assert_eq!(space.unused_addresses().len(), 250);
        assert_eq!(space.first_unused(), Some(ip("10.0.0.4")));
    }

    #[test]
    fn test_ipv6_unused_is_capped() {
        let space = AddressSpace::new(net("2001:db8::/32"), 3, [ip("2001:db8::beef")], 4000);
        assert_eq!(space.used_count(), 1);
        assert_eq!(space.unused_count(), 3997);
        assert_eq!(space.unused_addresses().len(), 3997);
        assert_eq!(space.first_unused(), Some(ip("2001:db8::4")));
        assert!(!space.reserved_addresses().contains(&ip("2001:db8:ffff:ffff:ffff:ffff:ffff:ffff")));
    }

    #[test]
    fn test_used_inside_window_reduces_unused() {
        let space = AddressSpace::new(
            net("2001:db8::/64"),
            3,
            [ip("2001:db8::4"), ip("2001:db8::4"), ip("2001:db9::1")],
            10,
        );
        assert_eq!(space.used_addresses(), &[ip("2001:db8::4")]);
        assert_eq!(space.unused_count(), 6);
        assert_eq!(space.first_unused(), Some(ip("2001:db8::5")));
    }

    #[test]
    fn test_tiny_networks() {
        for (range, reserved, expected) in [
            ("10.0.0.0/30", 2, 4),
            ("10.0.0.0/31", 2, 2),
            ("10.0.0.5/32", 1, 1),
            ("2001:db8::/127", 2, 2),
            ("2001:db8::1/128", 1, 1),
        ] {
            let space = AddressSpace::new(net(range), reserved, [], 4000);
            let size = usize::try_from(space.size()).unwrap();
            assert_eq!(space.reserved_addresses().len(), expected, "{range}");
            assert_eq!(expected, (reserved as usize + 2).min(size), "{range}");
            assert_eq!(space.unused_count(), 0, "{range}");
            assert_eq!(space.first_unused(), None, "{range}");
        }
    }

    #[test]
    fn test_counts_add_up_when_uncapped() {
        let used = [ip("10.1.0.9"), ip("10.1.0.10"), ip("10.1.0.62")];
        let space = AddressSpace::new(net("10.1.0.0/26"), 5, used, 4000);
        let total = space.used_count()
            + space.unused_count()
            + space.reserved_addresses().len() as u64;
        assert_eq!(u128::from(total), space.size());
        assert_eq!(space.first_unused(), space.unused_addresses().into_iter().next());
    }

    #[test]
    fn test_overlaps() {
        let networks = [network(1, "10.0.1.0/28"), network(2, "10.0.2.0/24")];

        let hits = overlapping(&networks, &net("10.0.1.0/29"), None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, NetworkId(1));

        let hits = overlapping(&networks, &net("10.0.0.0/16"), None);
        assert_eq!(hits.len(), 2);

        assert!(overlapping(&networks, &net("10.0.1.16/28"), None).is_empty());
        assert!(overlapping(&networks, &net("10.0.1.0/27"), Some(NetworkId(1))).is_empty());
        assert!(!ranges_overlap(&net("10.0.0.0/8"), &net("::/0")));
    }
}
