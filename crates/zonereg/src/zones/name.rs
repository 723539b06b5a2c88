//! Zone name grammars.
//!
//! Three grammars are recognised:
//! - forward names, e.g. `example.org`
//! - octet (`in-addr.arpa`) and nibble (`ip6.arpa`) aligned reverse names
//! - RFC 2317 classless names, `<first>/<prefix>.<c>.<b>.<a>.in-addr.arpa`

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::fmt::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use zonereg_core::{RegistryError, Result, ZoneKind};

/// IPv4 reverse suffix
pub const IN_ADDR_ARPA: &str = "in-addr.arpa";
/// IPv6 reverse suffix
pub const IP6_ARPA: &str = "ip6.arpa";

/// Returns true if `name` equals `zone` or lies below it.
#[must_use]
pub fn is_within(name: &str, zone: &str) -> bool {
    name == zone || is_below(name, zone)
}

/// Returns true if `name` lies strictly below `zone`.
#[must_use]
pub fn is_below(name: &str, zone: &str) -> bool {
    name.len() > zone.len()
        && name.ends_with(zone)
        && name.as_bytes()[name.len() - zone.len() - 1] == b'.'
}

/// Labels in front of `suffix`, or `None` if `name` is not below it.
fn labels_before<'a>(name: &'a str, suffix: &str) -> Option<Vec<&'a str>> {
    if !is_below(name, suffix) {
        return None;
    }
    let head = &name[..name.len() - suffix.len() - 1];
    Some(head.split('.').collect())
}

fn octet(field: &'static str, label: &str) -> Result<u8> {
    label
        .parse::<u8>()
        .ok()
        .filter(|o| o.to_string() == label)
        .ok_or_else(|| RegistryError::invalid(field, format!("'{label}' is not an octet")))
}

fn parse_in_addr(field: &'static str, labels: &[&str]) -> Result<ZoneKind> {
    if let Some((first, prefix)) = labels.first().and_then(|l| l.split_once('/')) {
        return parse_classless(field, first, prefix, &labels[1..]);
    }
    if labels.is_empty() || labels.len() > 4 {
        return Err(RegistryError::invalid(
            field,
            "reverse zone must have 1 to 4 octet labels",
        ));
    }
    let mut octets = [0u8; 4];
    for (i, label) in labels.iter().rev().enumerate() {
        octets[i] = octet(field, label)?;
    }
    // At most four labels, so the prefix fits in a u8.
    let prefix = u8::try_from(labels.len() * 8).unwrap_or(32);
    let network = Ipv4Net::new(Ipv4Addr::from(octets), prefix)
        .map_err(|e| RegistryError::invalid(field, e.to_string()))?;
    Ok(ZoneKind::Reverse {
        network: IpNet::V4(network),
    })
}

fn parse_classless(field: &'static str, first: &str, prefix: &str, rest: &[&str]) -> Result<ZoneKind> {
    let first = octet(field, first)?;
    let prefix: u8 = prefix
        .parse()
        .ok()
        .filter(|p| (25..=32).contains(p))
        .ok_or_else(|| RegistryError::invalid(field, "classless prefix must be 25 to 32"))?;
    if rest.len() != 3 {
        return Err(RegistryError::invalid(
            field,
            "classless zone needs exactly three octets after the subnet label",
        ));
    }
    let c = octet(field, rest[0])?;
    let b = octet(field, rest[1])?;
    let a = octet(field, rest[2])?;
    let network = Ipv4Net::new(Ipv4Addr::new(a, b, c, first), prefix)
        .map_err(|e| RegistryError::invalid(field, e.to_string()))?;
    if network.trunc() != network {
        return Err(RegistryError::invalid(
            field,
            format!("{first} is not aligned to a /{prefix} boundary"),
        ));
    }
    Ok(ZoneKind::Classless { network })
}

fn parse_ip6(field: &'static str, labels: &[&str]) -> Result<ZoneKind> {
    if labels.is_empty() || labels.len() > 32 {
        return Err(RegistryError::invalid(
            field,
            "reverse zone must have 1 to 32 nibble labels",
        ));
    }
    let mut value: u128 = 0;
    for (i, label) in labels.iter().rev().enumerate() {
        let nibble = match label.as_bytes() {
            [c] => char::from(*c).to_digit(16),
            _ => None,
        }
        .ok_or_else(|| RegistryError::invalid(field, format!("'{label}' is not a nibble")))?;
        value |= u128::from(nibble) << (124 - 4 * i);
    }
    // At most 32 labels, so the prefix fits in a u8.
    let prefix = u8::try_from(labels.len() * 4).unwrap_or(128);
    let network = Ipv6Net::new(Ipv6Addr::from(value), prefix)
        .map_err(|e| RegistryError::invalid(field, e.to_string()))?;
    Ok(ZoneKind::Reverse {
        network: IpNet::V6(network),
    })
}

/// Determine which grammar a normalized zone name follows.
pub fn parse_zone_kind(field: &'static str, name: &str) -> Result<ZoneKind> {
    if name == IN_ADDR_ARPA || name == IP6_ARPA {
        return Err(RegistryError::invalid(
            field,
            format!("'{name}' is a reverse tree root, not a zone"),
        ));
    }
    if let Some(labels) = labels_before(name, IN_ADDR_ARPA) {
        return parse_in_addr(field, &labels);
    }
    if let Some(labels) = labels_before(name, IP6_ARPA) {
        return parse_ip6(field, &labels);
    }
    if name.contains('/') {
        return Err(RegistryError::invalid(
            field,
            "classless labels are only valid below in-addr.arpa",
        ));
    }
    Ok(ZoneKind::Forward)
}

/// Full reverse-tree name of an address, without trailing dot.
#[must_use]
pub fn reverse_pointer(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{d}.{c}.{b}.{a}.{IN_ADDR_ARPA}")
        }
        IpAddr::V6(v6) => {
            let value = u128::from(v6);
            let mut name = String::with_capacity(72);
            for i in 0..32 {
                let nibble = (value >> (4 * i)) & 0xf;
                let _ = write!(name, "{nibble:x}.");
            }
            name.push_str(IP6_ARPA);
            name
        }
    }
}

/// Owner name for `addr` inside reverse zone `zone`, relative to the zone.
///
/// Classless zones use the last octet, which is how the parent's CNAMEs
/// point into them.
#[must_use]
pub fn ptr_owner(addr: IpAddr, zone: &str, kind: &ZoneKind) -> String {
    match (kind, addr) {
        (ZoneKind::Classless { .. }, IpAddr::V4(v4)) => v4.octets()[3].to_string(),
        _ => {
            let full = reverse_pointer(addr);
            if is_below(&full, zone) {
                full[..full.len() - zone.len() - 1].to_string()
            } else {
                format!("{full}.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(name: &str) -> Result<ZoneKind> {
        parse_zone_kind("name", name)
    }

    #[test]
    fn test_forward_names() {
        assert_eq!(kind("example.org").unwrap(), ZoneKind::Forward);
        assert_eq!(kind("arpa").unwrap(), ZoneKind::Forward);
        assert!(kind("1/2.example.org").is_err());
    }

    #[test]
    fn test_in_addr_names() {
        assert_eq!(
            kind("0.10.in-addr.arpa").unwrap().network(),
            Some("10.0.0.0/16".parse().unwrap())
        );
        assert_eq!(
            kind("5.0.0.10.in-addr.arpa").unwrap().network(),
            Some("10.0.0.5/32".parse().unwrap())
        );
        assert!(kind("in-addr.arpa").is_err());
        assert!(kind("256.10.in-addr.arpa").is_err());
        assert!(kind("01.10.in-addr.arpa").is_err());
        assert!(kind("1.1.1.1.10.in-addr.arpa").is_err());
    }

    #[test]
    fn test_ip6_names() {
        assert_eq!(
            kind("8.b.d.0.1.0.0.2.ip6.arpa").unwrap().network(),
            Some("2001:db8::/32".parse().unwrap())
        );
        assert!(kind("8.bd.0.1.0.0.2.ip6.arpa").is_err());
        assert!(kind("g.ip6.arpa").is_err());
    }

    #[test]
    fn test_classless_names() {
        let parsed = kind("128/25.0.0.10.in-addr.arpa").unwrap();
        assert_eq!(
            parsed,
            ZoneKind::Classless {
                network: "10.0.0.128/25".parse().unwrap()
            }
        );
        assert!(kind("100/25.0.0.10.in-addr.arpa").is_err());
        assert!(kind("0/24.0.0.10.in-addr.arpa").is_err());
        assert!(kind("0/26.0.10.in-addr.arpa").is_err());
    }

    #[test]
    fn test_reverse_pointer() {
        assert_eq!(
            reverse_pointer("10.0.0.5".parse().unwrap()),
            "5.0.0.10.in-addr.arpa"
        );
        let v6 = reverse_pointer("2001:db8::beef".parse().unwrap());
        assert!(v6.starts_with("f.e.e.b.0.0.0.0."));
        assert!(v6.ends_with("8.b.d.0.1.0.0.2.ip6.arpa"));
    }

    #[test]
    fn test_ptr_owner() {
        let addr: IpAddr = "10.0.0.130".parse().unwrap();
        let reverse = kind("0.10.in-addr.arpa").unwrap();
        assert_eq!(ptr_owner(addr, "0.10.in-addr.arpa", &reverse), "130.0");

        let classless = kind("128/25.0.0.10.in-addr.arpa").unwrap();
        assert_eq!(
            ptr_owner(addr, "128/25.0.0.10.in-addr.arpa", &classless),
            "130"
        );
    }

    #[test]
    fn test_is_below() {
        assert!(is_below("host.example.org", "example.org"));
        assert!(!is_below("example.org", "example.org"));
        assert!(!is_below("badexample.org", "example.org"));
        assert!(is_within("example.org", "example.org"));
    }
}
