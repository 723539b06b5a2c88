//! Zone file rendering.
//!
//! Rendering is a single deterministic pass over one zone and the records
//! that feed it. Lines use fixed columns so consecutive renders diff cleanly.

mod line;
mod zonefile;

pub use line::{encode_email, encode_name, qualify, quoted, RecordKind, RecordLine, SoaBlock};
pub use zonefile::{build_zone_file, render_zone, ZoneFile};
