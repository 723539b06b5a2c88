use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address family and the capabilities that differ between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Family of an address.
    #[must_use]
    pub const fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Family of a range.
    #[must_use]
    pub const fn of_net(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => Self::V4,
            IpNet::V6(_) => Self::V6,
        }
    }

    /// Address width in bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }

    /// The last address of a range is a broadcast address.
    #[must_use]
    pub const fn has_broadcast(self) -> bool {
        matches!(self, Self::V4)
    }

    /// Unused-address queries only look at a bounded window of the range.
    #[must_use]
    pub const fn bounds_enumeration(self) -> bool {
        matches!(self, Self::V6)
    }

    /// Build an address of this family from its integer value.
    #[must_use]
    pub fn addr(self, value: u128) -> IpAddr {
        match self {
            // Values come from ranges of this family, so they fit.
            Self::V4 => IpAddr::V4(Ipv4Addr::from(u32::try_from(value).unwrap_or(u32::MAX))),
            Self::V6 => IpAddr::V6(Ipv6Addr::from(value)),
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4 => write!(f, "ipv4"),
            Self::V6 => write!(f, "ipv6"),
        }
    }
}

/// Integer value of an address.
#[must_use]
pub fn to_u128(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        assert!(Family::V4.has_broadcast());
        assert!(!Family::V6.has_broadcast());
        assert!(Family::V6.bounds_enumeration());
        assert!(!Family::V4.bounds_enumeration());
    }

    #[test]
    fn test_integer_round_trip() {
        let v4: IpAddr = "10.0.0.17".parse().unwrap();
        assert_eq!(to_u128(v4), 0x0a00_0011);
        assert_eq!(Family::V4.addr(0x0a00_0011), v4);

        let v6: IpAddr = "2001:db8::beef".parse().unwrap();
        assert_eq!(Family::V6.addr(to_u128(v6)), v6);
    }
}
