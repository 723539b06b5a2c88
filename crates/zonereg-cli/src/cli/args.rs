//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use ipnet::IpNet;
use std::net::IpAddr;
use std::path::PathBuf;
use zonereg_core::{
    MacAddress, NetworkAttrs, NewCname, NewMx, NewNaptr, NewSrv, NewSshfp, NewTxt,
};

use crate::logging::LogFormat;
use crate::output::OutputFormat;

/// DNS zone inventory manager
///
/// Tracks networks, hosts and their records, and renders zone files whose
/// serials only move when the zone content changed.
#[derive(Parser, Debug)]
#[command(name = "zonereg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON state file (or set ZONEREG_STATE)
    #[arg(short, long, env = "ZONEREG_STATE", global = true)]
    pub state: Option<PathBuf>,

    /// Registry settings file (or set ZONEREG_CONFIG)
    #[arg(short = 'c', long = "config", env = "ZONEREG_CONFIG", global = true)]
    pub registry_config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Address ranges and allocation
    Network(NetworkArgs),

    /// Zones, nameservers, delegations and rendering
    Zone(ZoneArgs),

    /// Hosts, their addresses and PTR overrides
    Host(HostArgs),

    /// Auxiliary records attached to hosts
    Record(RecordArgs),

    /// Audit log
    History(HistoryArgs),

    /// DHCP host bindings for addresses with a MAC
    Dhcp(DhcpArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Network command
// ============================================================================

#[derive(Args, Debug)]
pub struct NetworkArgs {
    #[command(subcommand)]
    pub command: NetworkCommands,
}

#[derive(Subcommand, Debug)]
pub enum NetworkCommands {
    /// Create a network; overlapping ranges are refused
    Create {
        /// CIDR range, e.g. 10.0.0.0/24
        range: IpNet,

        #[command(flatten)]
        attrs: NetworkAttrArgs,
    },

    /// Show a network and its allocation summary
    Show {
        range: IpNet,
    },

    /// List all networks
    List,

    /// Change a network's range or attributes
    Patch {
        range: IpNet,

        /// Move the network to a new range
        #[arg(long)]
        new_range: Option<IpNet>,

        #[command(flatten)]
        attrs: NetworkAttrArgs,
    },

    /// Delete a network with no addresses in use
    Delete {
        range: IpNet,
    },

    /// Find the network containing an address
    ByIp {
        address: IpAddr,
    },

    /// Reserved addresses
    Reserved {
        range: IpNet,
    },

    /// Addresses in use
    Used {
        range: IpNet,
    },

    /// Free addresses, lowest first
    Unused {
        range: IpNet,

        /// Maximum number of addresses to list
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Lowest free address
    FirstUnused {
        range: IpNet,
    },

    /// PTR overrides inside the range
    PtrOverrides {
        range: IpNet,
    },
}

#[derive(Args, Debug, Default)]
pub struct NetworkAttrArgs {
    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,

    /// VLAN id; networks sharing a VLAN share one MAC namespace
    #[arg(long)]
    pub vlan: Option<u32>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// Freeze the network (true/false)
    #[arg(long)]
    pub frozen: Option<bool>,

    /// Reverse DNS is delegated elsewhere (true/false)
    #[arg(long)]
    pub dns_delegated: Option<bool>,

    /// Number of host addresses withheld after the network address
    #[arg(long)]
    pub reserved: Option<u32>,
}

impl From<NetworkAttrArgs> for NetworkAttrs {
    fn from(args: NetworkAttrArgs) -> Self {
        Self {
            description: args.description,
            vlan: args.vlan,
            category: args.category,
            location: args.location,
            frozen: args.frozen,
            dns_delegated: args.dns_delegated,
            reserved: args.reserved,
        }
    }
}

// ============================================================================
// Zone command
// ============================================================================

#[derive(Args, Debug)]
pub struct ZoneArgs {
    #[command(subcommand)]
    pub command: ZoneCommands,
}

#[derive(Subcommand, Debug)]
pub enum ZoneCommands {
    /// Create a forward or reverse zone
    Create {
        /// Zone name, e.g. example.org or 0.0.10.in-addr.arpa
        name: String,

        /// Nameserver FQDN (repeatable)
        #[arg(long = "ns", required = true)]
        nameservers: Vec<String>,

        /// Responsible person, e.g. hostmaster@example.org
        #[arg(long)]
        email: String,

        /// Primary nameserver (default: the first --ns)
        #[arg(long)]
        primary_ns: Option<String>,

        #[command(flatten)]
        soa: SoaArgs,
    },

    /// Show a zone with its nameservers and delegations
    Show {
        name: String,
    },

    /// List all zones
    List,

    /// Change SOA fields
    Patch {
        name: String,

        /// Primary nameserver; must be one of the zone's nameservers
        #[arg(long)]
        primary_ns: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[command(flatten)]
        soa: SoaArgs,
    },

    /// Delete a zone
    Delete {
        name: String,
    },

    /// Replace the nameserver list; the first becomes primary
    SetNs {
        name: String,

        #[arg(required = true)]
        nameservers: Vec<String>,
    },

    /// Set or clear a nameserver's TTL
    NsTtl {
        /// Nameserver FQDN
        nameserver: String,

        /// TTL in seconds; omit to clear
        #[arg(long)]
        ttl: Option<u32>,
    },

    /// Delegate a name below the zone
    Delegate {
        zone: String,

        /// Delegated name, e.g. sub.example.org or 0/26.0.0.10.in-addr.arpa
        name: String,

        /// Nameserver FQDN (repeatable)
        #[arg(long = "ns", required = true)]
        nameservers: Vec<String>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Remove a delegation
    Undelegate {
        zone: String,
        name: String,
    },

    /// Render the zone file, bumping the serial if the zone changed
    Render {
        name: String,

        /// Write to a file instead of stdout
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct SoaArgs {
    /// SOA refresh in seconds
    #[arg(long)]
    pub refresh: Option<u32>,

    /// SOA retry in seconds
    #[arg(long)]
    pub retry: Option<u32>,

    /// SOA expire in seconds
    #[arg(long)]
    pub expire: Option<u32>,

    /// Default TTL and negative cache time in seconds
    #[arg(long)]
    pub ttl: Option<u32>,
}

// ============================================================================
// Host command
// ============================================================================

#[derive(Args, Debug)]
pub struct HostArgs {
    #[command(subcommand)]
    pub command: HostCommands,
}

#[derive(Subcommand, Debug)]
pub enum HostCommands {
    /// Create a host, optionally with its first address
    Create {
        /// Host FQDN
        name: String,

        /// Contact email
        #[arg(long)]
        contact: String,

        #[command(flatten)]
        fields: HostFieldArgs,

        /// First address
        #[arg(long = "ip")]
        ipaddress: Option<IpAddr>,
    },

    /// Show a host with its addresses and records
    Show {
        name: String,
    },

    /// List hosts
    List {
        /// Only hosts owned by this zone
        #[arg(long)]
        zone: Option<String>,
    },

    /// Change host fields
    Patch {
        name: String,

        /// New FQDN
        #[arg(long)]
        rename: Option<String>,

        #[arg(long)]
        contact: Option<String>,

        #[command(flatten)]
        fields: HostFieldArgs,
    },

    /// Delete a host with its addresses and records
    Delete {
        name: String,
    },

    /// Assign an address
    AddIp {
        host: String,
        address: IpAddr,

        /// Hardware address, e.g. 52:54:00:12:34:56
        #[arg(long)]
        mac: Option<MacAddress>,
    },

    /// Change an address row
    PatchIp {
        /// Address row id
        id: u64,

        #[arg(long)]
        address: Option<IpAddr>,

        #[arg(long, conflicts_with = "clear_mac")]
        mac: Option<MacAddress>,

        /// Remove the hardware address
        #[arg(long)]
        clear_mac: bool,
    },

    /// Remove an address row
    DeleteIp {
        /// Address row id
        id: u64,
    },

    /// Make HOST the PTR target of ADDRESS
    SetPtr {
        host: String,
        address: IpAddr,
    },

    /// Remove the PTR override of an address
    DeletePtr {
        address: IpAddr,
    },
}

#[derive(Args, Debug, Default)]
pub struct HostFieldArgs {
    /// TTL in seconds
    #[arg(long)]
    pub ttl: Option<u32>,

    /// HINFO preset id
    #[arg(long)]
    pub hinfo: Option<u64>,

    /// LOC record data
    #[arg(long)]
    pub loc: Option<String>,

    #[arg(long)]
    pub comment: Option<String>,
}

// ============================================================================
// Record command
// ============================================================================

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[command(subcommand)]
    pub command: RecordCommands,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// List every record attached to a host
    List {
        host: String,
    },

    /// Aliases
    Cname {
        #[command(subcommand)]
        command: CnameCommands,
    },

    /// Text records
    Txt {
        #[command(subcommand)]
        command: TxtCommands,
    },

    /// Mail exchangers
    Mx {
        #[command(subcommand)]
        command: MxCommands,
    },

    /// Service locators
    Srv {
        #[command(subcommand)]
        command: SrvCommands,
    },

    /// Naming authority pointers
    Naptr {
        #[command(subcommand)]
        command: NaptrCommands,
    },

    /// SSH key fingerprints
    Sshfp {
        #[command(subcommand)]
        command: SshfpCommands,
    },

    /// HINFO presets
    Hinfo {
        #[command(subcommand)]
        command: HinfoCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CnameCommands {
    /// Add an alias
    Add(CnameFields),
    /// Replace an alias
    Update {
        /// Current alias
        current: String,
        #[command(flatten)]
        fields: CnameFields,
    },
    /// Delete an alias
    Delete { name: String },
}

#[derive(Args, Debug)]
pub struct CnameFields {
    /// Alias FQDN
    pub name: String,
    /// Canonical host
    pub host: String,
    #[arg(long)]
    pub ttl: Option<u32>,
}

impl From<CnameFields> for NewCname {
    fn from(f: CnameFields) -> Self {
        Self {
            name: f.name,
            host: f.host,
            ttl: f.ttl,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum TxtCommands {
    /// Add a TXT record
    Add(TxtFields),
    /// Replace a TXT record
    Update {
        id: u64,
        #[command(flatten)]
        fields: TxtFields,
    },
    /// Delete a TXT record
    Delete { id: u64 },
}

#[derive(Args, Debug)]
pub struct TxtFields {
    pub host: String,
    pub txt: String,
}

impl From<TxtFields> for NewTxt {
    fn from(f: TxtFields) -> Self {
        Self {
            host: f.host,
            txt: f.txt,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum MxCommands {
    /// Add an MX record
    Add(MxFields),
    /// Replace an MX record
    Update {
        id: u64,
        #[command(flatten)]
        fields: MxFields,
    },
    /// Delete an MX record
    Delete { id: u64 },
}

#[derive(Args, Debug)]
pub struct MxFields {
    pub host: String,
    /// Mail exchanger FQDN
    pub mx: String,
    #[arg(long, default_value_t = 10)]
    pub priority: u16,
}

impl From<MxFields> for NewMx {
    fn from(f: MxFields) -> Self {
        Self {
            host: f.host,
            priority: f.priority,
            mx: f.mx,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum SrvCommands {
    /// Add an SRV record
    Add(SrvFields),
    /// Replace an SRV record
    Update {
        id: u64,
        #[command(flatten)]
        fields: SrvFields,
    },
    /// Delete an SRV record
    Delete { id: u64 },
}

#[derive(Args, Debug)]
pub struct SrvFields {
    /// Owner, e.g. _sip._tcp.example.org
    pub name: String,
    /// Target host
    pub host: String,
    #[arg(long)]
    pub port: u16,
    #[arg(long, default_value_t = 0)]
    pub priority: u16,
    #[arg(long, default_value_t = 0)]
    pub weight: u16,
    #[arg(long)]
    pub ttl: Option<u32>,
}

impl From<SrvFields> for NewSrv {
    fn from(f: SrvFields) -> Self {
        Self {
            name: f.name,
            priority: f.priority,
            weight: f.weight,
            port: f.port,
            ttl: f.ttl,
            host: f.host,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum NaptrCommands {
    /// Add a NAPTR record
    Add(NaptrFields),
    /// Replace a NAPTR record
    Update {
        id: u64,
        #[command(flatten)]
        fields: NaptrFields,
    },
    /// Delete a NAPTR record
    Delete { id: u64 },
}

#[derive(Args, Debug)]
pub struct NaptrFields {
    pub host: String,
    #[arg(long)]
    pub order: u16,
    #[arg(long)]
    pub preference: u16,
    /// One of a, s, u, p, or empty
    #[arg(long, default_value = "")]
    pub flag: String,
    #[arg(long)]
    pub service: String,
    #[arg(long, default_value = "")]
    pub regex: String,
    #[arg(long)]
    pub replacement: String,
}

impl From<NaptrFields> for NewNaptr {
    fn from(f: NaptrFields) -> Self {
        Self {
            host: f.host,
            order: f.order,
            preference: f.preference,
            flag: f.flag,
            service: f.service,
            regex: f.regex,
            replacement: f.replacement,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum SshfpCommands {
    /// Add an SSHFP record
    Add(SshfpFields),
    /// Replace an SSHFP record
    Update {
        id: u64,
        #[command(flatten)]
        fields: SshfpFields,
    },
    /// Delete an SSHFP record
    Delete { id: u64 },
}

#[derive(Args, Debug)]
pub struct SshfpFields {
    pub host: String,
    /// Hex digest
    pub fingerprint: String,
    /// 1 RSA, 2 DSA, 3 ECDSA, 4 Ed25519
    #[arg(long)]
    pub algorithm: u8,
    /// 1 SHA-1, 2 SHA-256
    #[arg(long)]
    pub hash_type: u8,
}

impl From<SshfpFields> for NewSshfp {
    fn from(f: SshfpFields) -> Self {
        Self {
            host: f.host,
            algorithm: f.algorithm,
            hash_type: f.hash_type,
            fingerprint: f.fingerprint,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum HinfoCommands {
    /// List presets
    List,
    /// Add a cpu/os pair
    Add { cpu: String, os: String },
    /// Delete an unused preset
    Delete { id: u64 },
}

// ============================================================================
// History command
// ============================================================================

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Tables with audit entries
    Tables,

    /// Changes to one row, oldest first
    Show {
        /// Table name, e.g. hosts
        table: String,
        /// Row id
        row: u64,
    },
}

// ============================================================================
// DHCP command
// ============================================================================

#[derive(Args, Debug)]
pub struct DhcpArgs {
    /// Only addresses inside this range
    #[arg(long)]
    pub range: Option<IpNet>,

    /// Only one address family
    #[arg(long, value_enum)]
    pub family: Option<FamilyArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
    #[value(name = "ipv4", alias = "4")]
    V4,
    #[value(name = "ipv6", alias = "6")]
    V6,
}

impl From<FamilyArg> for zonereg::Family {
    fn from(family: FamilyArg) -> Self {
        match family {
            FamilyArg::V4 => Self::V4,
            FamilyArg::V6 => Self::V6,
        }
    }
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Key to set (state_path, registry_config, output_format)
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,
}
