//! Zone file lines and name encoding.

use hickory_proto::rr::Name;
use std::fmt;
use zonereg_core::{RegistryError, Result};

use crate::zones::is_below;

/// Record types that appear in rendered zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Ns,
    A,
    Aaaa,
    Cname,
    Hinfo,
    Loc,
    Mx,
    Txt,
    Naptr,
    Sshfp,
    Srv,
    Ptr,
}

impl RecordKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ns => "NS",
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Hinfo => "HINFO",
            Self::Loc => "LOC",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Naptr => "NAPTR",
            Self::Sshfp => "SSHFP",
            Self::Srv => "SRV",
            Self::Ptr => "PTR",
        }
    }

    /// A or AAAA for an address.
    pub const fn address(addr: &std::net::IpAddr) -> Self {
        match addr {
            std::net::IpAddr::V4(_) => Self::A,
            std::net::IpAddr::V6(_) => Self::Aaaa,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One resource record:
/// `{owner:<24} {ttl:<5} IN {type:<6} {data}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLine {
    pub owner: String,
    pub ttl: Option<u32>,
    pub kind: RecordKind,
    pub data: String,
}

impl RecordLine {
    pub fn new(owner: impl Into<String>, ttl: Option<u32>, kind: RecordKind, data: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ttl,
            kind,
            data: data.into(),
        }
    }
}

impl fmt::Display for RecordLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ttl = self.ttl.map(|t| t.to_string()).unwrap_or_default();
        write!(
            f,
            "{:<24} {:<5} IN {:<6} {}",
            self.owner, ttl, self.kind, self.data
        )
    }
}

/// SOA header block with `$ORIGIN` and `$TTL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoaBlock {
    /// Encoded zone name without trailing dot
    pub origin: String,
    pub mname: String,
    pub rname: String,
    pub serial: u64,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub ttl: u32,
}

/// Column of the SOA timer values.
const SOA_INDENT: usize = 41;

impl fmt::Display for SoaBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "$ORIGIN {}.", self.origin)?;
        writeln!(f, "$TTL {}", self.ttl)?;
        writeln!(f, "{:<30} IN SOA    {} {} (", "@", self.mname, self.rname)?;
        let timers = [
            (self.serial.to_string(), "Serialnumber"),
            (self.refresh.to_string(), "Refresh"),
            (self.retry.to_string(), "Retry"),
            (self.expire.to_string(), "Expire"),
            (format!("{} )", self.ttl), "Negative Cache"),
        ];
        for (value, comment) in timers {
            writeln!(f, "{:SOA_INDENT$}{value:<12}; {comment}", "")?;
        }
        Ok(())
    }
}

/// Punycode-encode a name. Plain ASCII names pass through unchanged.
pub fn encode_name(zone: &str, name: &str) -> Result<String> {
    if name.is_ascii() {
        return Ok(name.to_string());
    }
    Name::from_utf8(name)
        .map(|n| n.to_ascii().trim_end_matches('.').to_string())
        .map_err(|e| RegistryError::Render {
            zone: zone.to_string(),
            reason: format!("cannot encode {name}: {e}"),
        })
}

/// Write `name` for use inside `zone`: `@` for the apex, relative below
/// it, fully qualified otherwise. Both names must already be encoded.
pub fn qualify(name: &str, zone: &str) -> String {
    if name == zone {
        "@".to_string()
    } else if is_below(name, zone) {
        name[..name.len() - zone.len() - 1].to_string()
    } else {
        format!("{name}.")
    }
}

/// SOA RNAME form of a mail address: dots in the local part escaped,
/// `@` replaced by a dot, fully qualified.
pub fn encode_email(zone: &str, email: &str) -> Result<String> {
    let (local, domain) = email.rsplit_once('@').ok_or_else(|| RegistryError::Render {
        zone: zone.to_string(),
        reason: format!("{email} is not a mail address"),
    })?;
    let domain = encode_name(zone, domain)?;
    Ok(format!("{}.{domain}.", local.replace('.', "\\.")))
}

/// Quote a character-string for TXT, HINFO and NAPTR data.
pub fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_line_columns() {
        let line = RecordLine::new("www", Some(300), RecordKind::A, "10.0.0.10");
        assert_eq!(
            line.to_string(),
            "www                      300   IN A      10.0.0.10"
        );

        let ns = RecordLine::new("", None, RecordKind::Ns, "ns1");
        assert_eq!(
            ns.to_string(),
            "                               IN NS     ns1"
        );
    }

    #[test]
    fn test_soa_block() {
        let soa = SoaBlock {
            origin: "example.org".into(),
            mname: "ns1".into(),
            rname: "hostmaster.example.org.".into(),
            serial: 2_026_101_901,
            refresh: 10_800,
            retry: 3_600,
            expire: 1_814_400,
            ttl: 43_200,
        };
        let text = soa.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "$ORIGIN example.org.");
        assert_eq!(lines[1], "$TTL 43200");
        assert!(lines[2].starts_with("@   "));
        assert!(lines[2].ends_with("IN SOA    ns1 hostmaster.example.org. ("));
        assert_eq!(lines[3].trim_start(), "2026101901  ; Serialnumber");
        assert_eq!(lines[3].find('2'), Some(SOA_INDENT));
        assert_eq!(lines[7].trim_start(), "43200 )     ; Negative Cache");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("example.org", "example.org"), "@");
        assert_eq!(qualify("www.example.org", "example.org"), "www");
        assert_eq!(qualify("ns2.example.net", "example.org"), "ns2.example.net.");
        assert_eq!(qualify("wwwexample.org", "example.org"), "wwwexample.org.");
    }

    #[test]
    fn test_encode_name_idna() {
        assert_eq!(encode_name("z", "www.example.org").unwrap(), "www.example.org");
        assert_eq!(
            encode_name("z", "bücher.example.org").unwrap(),
            "xn--bcher-kva.example.org"
        );
    }

    #[test]
    fn test_encode_email() {
        assert_eq!(
            encode_email("z", "first.last@example.org").unwrap(),
            "first\\.last.example.org."
        );
        assert!(encode_email("z", "nobody").is_err());
    }

    #[test]
    fn test_quoted_escapes() {
        assert_eq!(quoted("v=spf1 -all"), "\"v=spf1 -all\"");
        assert_eq!(quoted("say \"hi\""), "\"say \\\"hi\\\"\"");
    }
}
