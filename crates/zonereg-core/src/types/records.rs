//! Auxiliary records hanging off a host.
//!
//! Each record has a stored form keyed by its surrogate id and a `New*` input
//! that names the owning host by its FQDN. Updates replace the record data
//! wholesale with a fresh `New*` value.

use serde::{Deserialize, Serialize};

use super::{CnameId, HinfoPresetId, HostId, MxId, NaptrId, SrvId, SshfpId, TxtId, ZoneId};

/// CNAME: `name` is an alias for `host`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cname {
    pub id: CnameId,
    /// Alias owner name, unique and never a host name
    pub name: String,
    /// Canonical host
    pub host: HostId,
    #[serde(default)]
    pub ttl: Option<u32>,
    /// Forward zone owning the alias
    #[serde(default)]
    pub zone: Option<ZoneId>,
}

/// Input for a CNAME
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCname {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// TXT record data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Txt {
    pub id: TxtId,
    pub host: HostId,
    pub txt: String,
}

/// Input for a TXT record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTxt {
    pub host: String,
    pub txt: String,
}

/// Mail exchanger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mx {
    pub id: MxId,
    pub host: HostId,
    pub priority: u16,
    pub mx: String,
}

/// Input for an MX record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMx {
    pub host: String,
    pub priority: u16,
    pub mx: String,
}

/// Service locator, owned by its `_service._proto.name` rather than the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Srv {
    pub id: SrvId,
    pub name: String,
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    #[serde(default)]
    pub ttl: Option<u32>,
    /// Target host
    pub host: HostId,
    #[serde(default)]
    pub zone: Option<ZoneId>,
}

/// Input for an SRV record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSrv {
    pub name: String,
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    #[serde(default)]
    pub ttl: Option<u32>,
    pub host: String,
}

/// Naming authority pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Naptr {
    pub id: NaptrId,
    pub host: HostId,
    pub order: u16,
    pub preference: u16,
    /// One of `a`, `s`, `u`, `p`, or empty
    #[serde(default)]
    pub flag: String,
    pub service: String,
    #[serde(default)]
    pub regex: String,
    pub replacement: String,
}

/// Input for a NAPTR record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNaptr {
    pub host: String,
    pub order: u16,
    pub preference: u16,
    #[serde(default)]
    pub flag: String,
    pub service: String,
    #[serde(default)]
    pub regex: String,
    pub replacement: String,
}

/// SSH host key fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sshfp {
    pub id: SshfpId,
    pub host: HostId,
    /// 1 RSA, 2 DSA, 3 ECDSA, 4 Ed25519
    pub algorithm: u8,
    /// 1 SHA-1, 2 SHA-256
    pub hash_type: u8,
    /// Lowercase hex digest
    pub fingerprint: String,
}

/// Input for an SSHFP record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSshfp {
    pub host: String,
    pub algorithm: u8,
    pub hash_type: u8,
    pub fingerprint: String,
}

/// Shared HINFO cpu/os pair referenced by hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HinfoPreset {
    pub id: HinfoPresetId,
    pub cpu: String,
    pub os: String,
}

/// Input for a HINFO preset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewHinfoPreset {
    pub cpu: String,
    pub os: String,
}
