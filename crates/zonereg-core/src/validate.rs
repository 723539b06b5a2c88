//! Field validators.
//!
//! Every validator takes the field name used in the resulting
//! [`RegistryError::Invalid`] and returns the normalized value on success.

use hickory_proto::rr::Name;

use crate::{RegistryError, Result};

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

fn check_label(field: &'static str, label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(RegistryError::invalid(field, "empty label"));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(RegistryError::invalid(
            field,
            format!("label '{label}' is longer than {MAX_LABEL_LEN} characters"),
        ));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(RegistryError::invalid(
            field,
            format!("label '{label}' starts or ends with a hyphen"),
        ));
    }
    if let Some(c) = label
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(RegistryError::invalid(
            field,
            format!("label '{label}' contains '{c}'"),
        ));
    }
    Ok(())
}

fn normalize_name(field: &'static str, value: &str) -> Result<String> {
    let name = value.trim().trim_end_matches('.').to_lowercase();
    if name.is_empty() {
        return Err(RegistryError::invalid(field, "name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(RegistryError::invalid(
            field,
            format!("name is longer than {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(name)
}

/// Non-ASCII names must survive the IDNA encoding used in zone files.
fn check_idna(field: &'static str, name: &str) -> Result<()> {
    if name.is_ascii() {
        return Ok(());
    }
    Name::from_utf8(name).map(|_| ()).map_err(|e| {
        RegistryError::invalid(field, format!("'{name}' cannot be IDNA encoded: {e}"))
    })
}

/// Validate a fully qualified host name with at least two labels.
///
/// Returns the lowercase name without a trailing dot.
pub fn hostname(field: &'static str, value: &str) -> Result<String> {
    let name = normalize_name(field, value)?;
    if !name.contains('.') {
        return Err(RegistryError::invalid(
            field,
            format!("'{name}' is not fully qualified"),
        ));
    }
    for label in name.split('.') {
        check_label(field, label)?;
    }
    check_idna(field, &name)?;
    Ok(name)
}

/// Validate a zone name. The first label may be an RFC 2317 `A/B` label;
/// its numeric meaning is checked when the zone grammar is parsed.
pub fn zone_name(field: &'static str, value: &str) -> Result<String> {
    let name = normalize_name(field, value)?;
    let mut labels = name.split('.');
    if let Some(first) = labels.next() {
        match first.split_once('/') {
            Some((a, b))
                if !a.is_empty()
                    && !b.is_empty()
                    && a.bytes().all(|c| c.is_ascii_digit())
                    && b.bytes().all(|c| c.is_ascii_digit()) => {}
            Some(_) => {
                return Err(RegistryError::invalid(
                    field,
                    format!("malformed classless label '{first}'"),
                ))
            }
            None => check_label(field, first)?,
        }
    }
    for label in labels {
        check_label(field, label)?;
    }
    check_idna(field, &name)?;
    Ok(name)
}

/// Validate a contact or SOA email address.
pub fn email(field: &'static str, value: &str) -> Result<String> {
    let value = value.trim();
    let Some((local, domain)) = value.rsplit_once('@') else {
        return Err(RegistryError::invalid(field, format!("'{value}' has no '@'")));
    };
    if local.is_empty() || local.chars().any(|c| c.is_whitespace() || c == '@') {
        return Err(RegistryError::invalid(
            field,
            format!("'{value}' has an invalid local part"),
        ));
    }
    let domain = hostname(field, domain)?;
    Ok(format!("{local}@{domain}"))
}

/// Validate a MAC address in lowercase `xx:xx:xx:xx:xx:xx` form.
pub fn mac_address(field: &'static str, value: &str) -> Result<String> {
    let groups: Vec<&str> = value.split(':').collect();
    let valid = groups.len() == 6
        && groups.iter().all(|g| {
            g.len() == 2
                && g
                    .bytes()
                    .all(|c| c.is_ascii_digit() || (b'a'..=b'f').contains(&c))
        });
    if valid {
        Ok(value.to_string())
    } else {
        Err(RegistryError::invalid(
            field,
            format!("'{value}' is not a lowercase xx:xx:xx:xx:xx:xx address"),
        ))
    }
}

/// Validate a TTL against inclusive bounds.
pub fn ttl(field: &'static str, value: u32, min: u32, max: u32) -> Result<u32> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(RegistryError::invalid(
            field,
            format!("{value} is outside {min}..={max}"),
        ))
    }
}

/// Validate an optional TTL.
pub fn ttl_opt(field: &'static str, value: Option<u32>, min: u32, max: u32) -> Result<()> {
    value.map_or(Ok(()), |v| ttl(field, v, min, max).map(|_| ()))
}

/// Reject zero for SOA timers.
pub fn positive(field: &'static str, value: u32) -> Result<u32> {
    if value == 0 {
        Err(RegistryError::invalid(field, "must be positive"))
    } else {
        Ok(value)
    }
}

/// Reject blank strings.
pub fn non_empty(field: &'static str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(RegistryError::invalid(field, "must not be empty"))
    } else {
        Ok(value.to_string())
    }
}

/// TXT data is 1 to 255 characters.
pub fn txt(field: &'static str, value: &str) -> Result<String> {
    let len = value.chars().count();
    if (1..=255).contains(&len) {
        Ok(value.to_string())
    } else {
        Err(RegistryError::invalid(
            field,
            format!("length {len} is outside 1..=255"),
        ))
    }
}

/// Validate an SRV owner name of the form `_service._proto.name`.
pub fn srv_name(field: &'static str, value: &str) -> Result<String> {
    let name = normalize_name(field, value)?;
    let mut labels = name.splitn(3, '.');
    let service = labels.next().unwrap_or_default();
    let proto = labels.next().unwrap_or_default();
    let rest = labels.next().unwrap_or_default();

    let service_ok = service.len() > 1
        && service.starts_with('_')
        && service[1..]
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b'-');
    if !service_ok {
        return Err(RegistryError::invalid(
            field,
            format!("'{name}' must start with a _service label"),
        ));
    }
    if !matches!(proto, "_tcp" | "_udp" | "_tls" | "_sctp") {
        return Err(RegistryError::invalid(
            field,
            format!("'{name}' has unknown protocol label '{proto}'"),
        ));
    }
    hostname(field, rest)?;
    Ok(name)
}

/// NAPTR flag is one of `a`, `s`, `u`, `p`, or empty.
pub fn naptr_flag(field: &'static str, value: &str) -> Result<String> {
    let flag = value.to_lowercase();
    if matches!(flag.as_str(), "" | "a" | "s" | "u" | "p") {
        Ok(flag)
    } else {
        Err(RegistryError::invalid(
            field,
            format!("'{value}' is not one of a, s, u, p"),
        ))
    }
}

/// Validate SSHFP algorithm, hash type and fingerprint together.
pub fn sshfp(algorithm: u8, hash_type: u8, fingerprint: &str) -> Result<String> {
    if !(1..=4).contains(&algorithm) {
        return Err(RegistryError::invalid(
            "algorithm",
            format!("{algorithm} is not 1 (RSA), 2 (DSA), 3 (ECDSA) or 4 (Ed25519)"),
        ));
    }
    let expected_len = match hash_type {
        1 => 40,
        2 => 64,
        _ => {
            return Err(RegistryError::invalid(
                "hash_type",
                format!("{hash_type} is not 1 (SHA-1) or 2 (SHA-256)"),
            ))
        }
    };
    let fingerprint = fingerprint.to_lowercase();
    if fingerprint.len() != expected_len || !fingerprint.bytes().all(|c| c.is_ascii_hexdigit()) {
        return Err(RegistryError::invalid(
            "fingerprint",
            format!("expected {expected_len} hex digits"),
        ));
    }
    Ok(fingerprint)
}

fn parse_in_range(token: &str, max: f64) -> Option<f64> {
    let v: f64 = token.parse().ok()?;
    (0.0..=max).contains(&v).then_some(v)
}

fn parse_meters(token: &str, min: f64, max: f64) -> bool {
    token
        .strip_suffix('m')
        .unwrap_or(token)
        .parse::<f64>()
        .is_ok_and(|v| (min..=max).contains(&v))
}

/// Parse one `deg [min [sec]] HEMI` coordinate, returning the remaining tokens.
fn coordinate<'a>(tokens: &'a [&'a str], max_deg: f64, hemis: [&str; 2]) -> Option<&'a [&'a str]> {
    let deg = tokens.first()?;
    parse_in_range(deg, max_deg)?;
    let mut rest = &tokens[1..];
    for max in [59.0, 59.999] {
        match rest.first() {
            Some(t) if hemis.contains(t) => break,
            Some(t) => {
                parse_in_range(t, max)?;
                rest = &rest[1..];
            }
            None => return None,
        }
    }
    let hemi = rest.first()?;
    hemis.contains(hemi).then(|| &rest[1..])
}

/// Validate RFC 1876 LOC text:
/// `d1 [m1 [s1]] {N|S} d2 [m2 [s2]] {E|W} alt[m] [siz[m] [hp[m] [vp[m]]]]`
pub fn loc(field: &'static str, value: &str) -> Result<String> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let valid = coordinate(&tokens, 90.0, ["N", "S"])
        .and_then(|rest| coordinate(rest, 180.0, ["E", "W"]))
        .is_some_and(|rest| {
            !rest.is_empty()
                && rest.len() <= 4
                && parse_meters(rest[0], -100_000.0, 42_849_672.95)
                && rest[1..]
                    .iter()
                    .all(|t| parse_meters(t, 0.0, 90_000_000.0))
        });
    if valid {
        Ok(tokens.join(" "))
    } else {
        Err(RegistryError::invalid(
            field,
            format!("'{value}' is not a valid LOC record"),
        ))
    }
}
