//! CIDR arithmetic over networks and the addresses allocated in them.
//!
//! - **Overlap**: [`overlapping`] finds networks intersecting a candidate range
//! - **Allocation**: [`AddressSpace`] answers reserved/used/unused queries for
//!   one network without touching the inventory
//!
//! IPv4 and IPv6 share one code path; the differences (broadcast address,
//! bounded unused enumeration) are capabilities of [`Family`].

mod family;
mod space;

pub use family::{to_u128, Family};
pub use space::{overlapping, range_size, ranges_overlap, AddressSpace};
