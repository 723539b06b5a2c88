//! Zone naming, host-to-zone resolution and dirty tracking.

mod dirty;
mod index;
mod name;

pub use dirty::{mark_dirty, update_serial_if_dirty, AffectedZones, Applied};
pub use index::ZoneIndex;
pub use name::{
    is_below, is_within, parse_zone_kind, ptr_owner, reverse_pointer, IN_ADDR_ARPA, IP6_ARPA,
};
