use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;

use super::{HinfoPresetId, HostId, IpaddressId, PtrOverrideId, ZoneId};
use crate::RegistryError;

/// A DNS host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Row id
    pub id: HostId,

    /// Fully qualified name, unique
    pub name: String,

    /// Contact email
    pub contact: String,

    /// Record TTL; the zone default when absent
    #[serde(default)]
    pub ttl: Option<u32>,

    /// HINFO preset
    #[serde(default)]
    pub hinfo: Option<HinfoPresetId>,

    /// LOC record data
    #[serde(default)]
    pub loc: Option<String>,

    /// Free-form comment, not rendered
    #[serde(default)]
    pub comment: Option<String>,

    /// Owning forward zone, derived from the name
    #[serde(default)]
    pub zone: Option<ZoneId>,
}

/// Input for creating a host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewHost {
    /// Fully qualified name
    pub name: String,

    /// Contact email
    pub contact: String,

    /// Record TTL
    #[serde(default)]
    pub ttl: Option<u32>,

    /// HINFO preset
    #[serde(default)]
    pub hinfo: Option<HinfoPresetId>,

    /// LOC record data
    #[serde(default)]
    pub loc: Option<String>,

    /// Comment
    #[serde(default)]
    pub comment: Option<String>,

    /// Address created together with the host
    #[serde(default)]
    pub ipaddress: Option<IpAddr>,
}

impl NewHost {
    /// Create a host input with the two required fields
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
            ..Self::default()
        }
    }

    /// Attach an initial address
    #[must_use]
    pub const fn with_ipaddress(mut self, address: IpAddr) -> Self {
        self.ipaddress = Some(address);
        self
    }

    /// Set the record TTL
    #[must_use]
    pub const fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Partial update of a host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostPatch {
    /// New name; re-resolves the owning zone
    #[serde(default)]
    pub name: Option<String>,

    /// New contact
    #[serde(default)]
    pub contact: Option<String>,

    /// New TTL
    #[serde(default)]
    pub ttl: Option<u32>,

    /// New HINFO preset
    #[serde(default)]
    pub hinfo: Option<HinfoPresetId>,

    /// New LOC data
    #[serde(default)]
    pub loc: Option<String>,

    /// New comment
    #[serde(default)]
    pub comment: Option<String>,
}

impl HostPatch {
    /// Returns true if any field that shows up in zone files changes
    #[must_use]
    pub const fn touches_rendered_data(&self) -> bool {
        self.name.is_some()
            || self.contact.is_some()
            || self.ttl.is_some()
            || self.hinfo.is_some()
            || self.loc.is_some()
    }
}

/// A hardware address in lowercase colon-separated form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// The address text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MacAddress {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::validate::mac_address("macaddress", s).map(Self)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An address assigned to a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipaddress {
    /// Row id
    pub id: IpaddressId,

    /// Owning host
    pub host: HostId,

    /// The address, unique per host
    pub address: IpAddr,

    /// Optional MAC, unique per VLAN group and address family
    #[serde(default)]
    pub macaddress: Option<MacAddress>,
}

/// Partial update of an address row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpaddressPatch {
    /// New address
    #[serde(default)]
    pub address: Option<IpAddr>,

    /// `Some(None)` removes the MAC
    #[serde(default)]
    pub macaddress: Option<Option<MacAddress>>,
}

/// Explicit reverse mapping for an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtrOverride {
    /// Row id
    pub id: PtrOverrideId,

    /// Host the PTR points at
    pub host: HostId,

    /// The address, globally unique
    pub address: IpAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_address_parsing() {
        let mac: MacAddress = "aa:bb:cc:00:00:10".parse().unwrap();
        assert_eq!(mac.as_str(), "aa:bb:cc:00:00:10");

        for bad in ["00:00:00:00:00:XX", "00:00:00:00:00", "AA:BB:cc:dd:ee:ff", ""] {
            assert!(bad.parse::<MacAddress>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_mac_address_serde() {
        let mac: MacAddress = serde_json::from_str("\"11:22:33:44:55:66\"").unwrap();
        assert_eq!(mac.to_string(), "11:22:33:44:55:66");
        assert!(serde_json::from_str::<MacAddress>("\"11-22-33-44-55-66\"").is_err());
    }

    #[test]
    fn test_host_patch_rendered_fields() {
        let patch = HostPatch {
            comment: Some("moved to rack 4".into()),
            ..HostPatch::default()
        };
        assert!(!patch.touches_rendered_data());

        let patch = HostPatch {
            ttl: Some(600),
            ..HostPatch::default()
        };
        assert!(patch.touches_rendered_data());
    }
}
