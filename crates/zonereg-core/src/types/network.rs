use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use super::NetworkId;

/// An IPv4 or IPv6 range under address management
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Row id
    pub id: NetworkId,

    /// CIDR range, the natural key
    pub range: IpNet,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// VLAN number; networks sharing one form a MAC uniqueness domain
    #[serde(default)]
    pub vlan: Option<u32>,

    /// Category tag
    #[serde(default)]
    pub category: Option<String>,

    /// Physical location
    #[serde(default)]
    pub location: Option<String>,

    /// Frozen networks accept no new allocations by policy
    #[serde(default)]
    pub frozen: bool,

    /// Reverse DNS for this range is delegated elsewhere
    #[serde(default)]
    pub dns_delegated: bool,

    /// Number of usable host addresses withheld from allocation
    pub reserved: u32,
}

/// Optional attributes supplied when creating a network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkAttrs {
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// VLAN number
    #[serde(default)]
    pub vlan: Option<u32>,

    /// Category tag
    #[serde(default)]
    pub category: Option<String>,

    /// Physical location
    #[serde(default)]
    pub location: Option<String>,

    /// Frozen flag
    #[serde(default)]
    pub frozen: Option<bool>,

    /// DNS delegated flag
    #[serde(default)]
    pub dns_delegated: Option<bool>,

    /// Reserved count; the configured default when absent
    #[serde(default)]
    pub reserved: Option<u32>,
}

/// Partial update of a network; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkPatch {
    /// New range, re-checked for overlaps
    #[serde(default)]
    pub range: Option<IpNet>,

    /// Attribute changes
    #[serde(flatten)]
    pub attrs: NetworkAttrs,
}

impl NetworkPatch {
    /// Returns true if the patch changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.range.is_none()
            && self.attrs.description.is_none()
            && self.attrs.vlan.is_none()
            && self.attrs.category.is_none()
            && self.attrs.location.is_none()
            && self.attrs.frozen.is_none()
            && self.attrs.dns_delegated.is_none()
            && self.attrs.reserved.is_none()
    }
}

/// One DHCP host binding derived from an address with a MAC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpHost {
    /// Host name
    pub host: String,

    /// Bound address
    pub address: std::net::IpAddr,

    /// Hardware address
    pub macaddress: super::MacAddress,
}
