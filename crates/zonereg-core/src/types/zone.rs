use chrono::{DateTime, Utc};
use ipnet::{IpNet, Ipv4Net};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{DelegationId, NameServerId, ZoneId};

/// Grammar a zone name was parsed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ZoneKind {
    /// Plain forward domain, e.g. `example.org`
    Forward,
    /// Octet or nibble aligned reverse zone under `in-addr.arpa`/`ip6.arpa`
    Reverse {
        /// Range covered by the zone
        network: IpNet,
    },
    /// RFC 2317 classless zone, e.g. `128/25.0.0.10.in-addr.arpa`
    Classless {
        /// Sub-/24 range covered by the zone
        network: Ipv4Net,
    },
}

impl ZoneKind {
    /// Returns the covered range for reverse zones
    #[must_use]
    pub fn network(&self) -> Option<IpNet> {
        match self {
            Self::Forward => None,
            Self::Reverse { network } => Some(*network),
            Self::Classless { network } => Some(IpNet::V4(*network)),
        }
    }

    /// Returns true for both reverse grammars
    #[must_use]
    pub const fn is_reverse(&self) -> bool {
        !matches!(self, Self::Forward)
    }
}

/// An authoritative zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Row id
    pub id: ZoneId,

    /// Zone name without trailing dot, unique
    pub name: String,

    /// Forward, reverse or classless
    pub kind: ZoneKind,

    /// SOA MNAME; always one of `nameservers`
    pub primary_ns: String,

    /// SOA RNAME in mail form
    pub email: String,

    /// `YYYYMMDDNN`
    pub serialno: u64,

    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    /// Default and negative-cache TTL
    pub ttl: u32,

    /// NS set
    pub nameservers: BTreeSet<NameServerId>,

    /// Dirty flag, consumed by render
    pub updated: bool,

    /// Last time the zone was marked dirty
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a zone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewZone {
    pub name: String,

    /// Nameserver FQDNs, at least one
    pub nameservers: Vec<String>,

    /// Primary nameserver; the first of `nameservers` when absent
    #[serde(default)]
    pub primary_ns: Option<String>,

    pub email: String,

    #[serde(default)]
    pub refresh: Option<u32>,
    #[serde(default)]
    pub retry: Option<u32>,
    #[serde(default)]
    pub expire: Option<u32>,
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl NewZone {
    /// Zone input with the required fields
    pub fn new<I, S>(name: impl Into<String>, nameservers: I, email: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            nameservers: nameservers.into_iter().map(Into::into).collect(),
            email: email.into(),
            ..Self::default()
        }
    }
}

/// SOA field update. Name and nameserver set are not patchable here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZonePatch {
    #[serde(default)]
    pub primary_ns: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub refresh: Option<u32>,
    #[serde(default)]
    pub retry: Option<u32>,
    #[serde(default)]
    pub expire: Option<u32>,
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// A nameserver shared between zones and delegations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameServer {
    pub id: NameServerId,
    /// FQDN, unique
    pub name: String,
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// NS delegation of a subtree of a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub id: DelegationId,
    /// Parent zone
    pub zone: ZoneId,
    /// Delegated name, strictly below the parent
    pub name: String,
    pub nameservers: BTreeSet<NameServerId>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Input for a delegation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDelegation {
    pub name: String,
    pub nameservers: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_kind_network() {
        assert_eq!(ZoneKind::Forward.network(), None);
        assert!(!ZoneKind::Forward.is_reverse());

        let net: Ipv4Net = "10.0.0.128/25".parse().unwrap();
        let kind = ZoneKind::Classless { network: net };
        assert!(kind.is_reverse());
        assert_eq!(kind.network(), Some(IpNet::V4(net)));
    }

    #[test]
    fn test_zone_kind_serde() {
        let kind = ZoneKind::Reverse {
            network: "10.0.0.0/8".parse().unwrap(),
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"kind":"reverse","network":"10.0.0.0/8"}"#);
        let back: ZoneKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
    }
}
