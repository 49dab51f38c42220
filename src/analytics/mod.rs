//! Aggregations over stored station snapshots.
//!
//! Every query is a pure read: it takes the store explicitly, scans it once
//! and returns named rows. An empty store yields empty rows (or `None` for
//! the single-row [`aggregate::global_types`]), never an error.

pub mod aggregate;
pub mod group;
pub mod profile;
pub mod types;
pub mod utility;
