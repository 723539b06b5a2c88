//! Zone dirty tracking.
//!
//! Mutations report the zones whose rendered text they change as an
//! [`AffectedZones`] set. [`mark_dirty`] is the single place that sets the
//! `updated` flag, and [`update_serial_if_dirty`] the single place that
//! consumes it and advances a serial.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};
use zonereg_core::{Result, Zone, ZoneId};

use crate::serial::create_serial;

/// Zones touched by one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectedZones(BTreeSet<ZoneId>);

impl AffectedZones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, zone: ZoneId) {
        self.0.insert(zone);
    }

    /// Insert a zone if there is one.
    pub fn insert_opt(&mut self, zone: Option<ZoneId>) {
        if let Some(zone) = zone {
            self.0.insert(zone);
        }
    }

    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, zone: ZoneId) -> bool {
        self.0.contains(&zone)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.0.iter().copied()
    }
}

impl Extend<Option<ZoneId>> for AffectedZones {
    fn extend<T: IntoIterator<Item = Option<ZoneId>>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().flatten());
    }
}

impl FromIterator<ZoneId> for AffectedZones {
    fn from_iter<T: IntoIterator<Item = ZoneId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of a mutation together with the zones it dirtied.
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub value: T,
    pub affected: AffectedZones,
}

impl<T> Applied<T> {
    pub const fn new(value: T, affected: AffectedZones) -> Self {
        Self { value, affected }
    }

    /// Drop the effect list.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Set `updated` on every affected zone. Marking an already dirty zone only
/// refreshes `updated_at`; zones that no longer exist are ignored.
pub fn mark_dirty(zones: &mut BTreeMap<ZoneId, Zone>, affected: &AffectedZones, now: DateTime<Utc>) {
    for id in affected.iter() {
        if let Some(zone) = zones.get_mut(&id) {
            if !zone.updated {
                tracing::debug!(zone = %zone.name, "zone marked dirty");
            }
            zone.updated = true;
            zone.updated_at = now;
        }
    }
}

/// Consume the dirty flag: if set, advance the serial for `today` and clear
/// it. Returns whether the serial changed. On error the zone is untouched.
pub fn update_serial_if_dirty(zone: &mut Zone, today: NaiveDate) -> Result<bool> {
    if !zone.updated {
        return Ok(false);
    }
    let serial = create_serial(Some(zone.serialno), today)?;
    tracing::info!(
        zone = %zone.name,
        previous = zone.serialno,
        serial,
        "serial updated"
    );
    zone.serialno = serial;
    zone.updated = false;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonereg_core::ZoneKind;

    fn zone(id: u64, serialno: u64, updated: bool) -> Zone {
        Zone {
            id: ZoneId(id),
            name: format!("zone{id}.example.org"),
            kind: ZoneKind::Forward,
            primary_ns: "ns1.example.org".into(),
            email: "hostmaster@example.org".into(),
            serialno,
            refresh: 10_800,
            retry: 3_600,
            expire: 1_814_400,
            ttl: 43_200,
            nameservers: BTreeSet::new(),
            updated,
            updated_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_mark_dirty_is_idempotent() {
        let mut zones = BTreeMap::from([(ZoneId(1), zone(1, 2_026_101_901, false))]);
        let affected: AffectedZones = [ZoneId(1), ZoneId(99)].into_iter().collect();
        let now = Utc::now();

        mark_dirty(&mut zones, &affected, now);
        mark_dirty(&mut zones, &affected, now);

        let z = &zones[&ZoneId(1)];
        assert!(z.updated);
        assert_eq!(z.updated_at, now);
        assert_eq!(z.serialno, 2_026_101_901);
    }

    #[test]
    fn test_update_serial_consumes_flag() {
        let mut z = zone(1, 2_026_101_901, true);
        assert!(update_serial_if_dirty(&mut z, today()).unwrap());
        assert_eq!(z.serialno, 2_026_101_902);
        assert!(!z.updated);

        assert!(!update_serial_if_dirty(&mut z, today()).unwrap());
        assert_eq!(z.serialno, 2_026_101_902);
    }

    #[test]
    fn test_exhausted_serial_keeps_zone_dirty() {
        let mut z = zone(1, 2_026_101_999, true);
        assert!(update_serial_if_dirty(&mut z, today()).is_err());
        assert!(z.updated);
        assert_eq!(z.serialno, 2_026_101_999);
    }

    #[test]
    fn test_affected_zones_collects_options() {
        let mut affected = AffectedZones::new();
        affected.extend([Some(ZoneId(3)), None, Some(ZoneId(1)), Some(ZoneId(3))]);
        affected.insert_opt(None);
        assert_eq!(affected.len(), 2);
        assert_eq!(affected.iter().collect::<Vec<_>>(), vec![ZoneId(1), ZoneId(3)]);
    }
}
