//! Inventory entity types.

mod changelog;
mod host;
mod network;
mod records;
mod zone;

pub use changelog::*;
pub use host::*;
pub use network::*;
pub use records::*;
pub use zone::*;

use serde::{Deserialize, Serialize};

macro_rules! surrogate_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<u64> for $name {
                fn from(id: u64) -> Self {
                    Self(id)
                }
            }
        )+
    };
}

surrogate_id!(
    /// Network row id
    NetworkId,
    /// Zone row id
    ZoneId,
    /// NameServer row id
    NameServerId,
    /// Delegation row id
    DelegationId,
    /// Host row id
    HostId,
    /// Ipaddress row id
    IpaddressId,
    /// PtrOverride row id
    PtrOverrideId,
    /// Cname row id
    CnameId,
    /// Txt row id
    TxtId,
    /// Mx row id
    MxId,
    /// Srv row id
    SrvId,
    /// Naptr row id
    NaptrId,
    /// Sshfp row id
    SshfpId,
    /// HinfoPreset row id
    HinfoPresetId,
    /// ModelChangeLog row id
    ChangeLogId,
);
