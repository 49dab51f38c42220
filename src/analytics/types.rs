//! Row types returned by the aggregation queries.
//!
//! Field names are part of the contract with dashboards and exports; they
//! serialize as-is to JSON and CSV.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Fleet-wide split between mechanical bikes and e-bikes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSplit {
    pub total_mech: u64,
    pub total_ebike: u64,
}

/// Bike availability aggregated over one commune.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommuneStats {
    pub commune: String,
    pub avg_bikes: f64,
    pub sum_bikes: u64,
}

/// Sort key for [`StationStats`] rankings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StationSort {
    #[default]
    Avg,
    Sum,
}

/// Bike availability aggregated over one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationStats {
    pub station_code: String,
    pub name: String,
    pub avg_bikes: f64,
    pub sum_bikes: u64,
}

/// Flat projection of one stored snapshot, for maps and station pickers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRow {
    pub station_code: String,
    pub name: String,
    pub bikes_available: u32,
    pub mechanical: u32,
    pub ebike: u32,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub commune: Option<String>,
}

/// How often a station was seen empty (no bikes) or full (no docks).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationEmptiness {
    pub station_code: String,
    pub name: String,
    pub total_snapshots: u64,
    pub pct_empty: f64,
    pub pct_full: f64,
}

/// One point of a bikes-over-time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub total_bikes: u64,
}

/// Mean fleet size at one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourProfile {
    pub hour: u32,
    pub avg_bikes: f64,
}

/// Mean fleet size on one day of the week (0 = Monday).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayProfile {
    pub weekday: u32,
    pub day: &'static str,
    pub avg_bikes: f64,
}

/// Mean fleet size on weekdays versus weekends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekPartProfile {
    pub is_weekend: u8,
    pub label: &'static str,
    pub avg_bikes: f64,
}

/// One bucket of any calendar profile, so the three profiles fit in a
/// single table. `profile` is `hourly`, `weekday` or `week_part`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRow {
    pub profile: &'static str,
    pub bucket: u32,
    pub label: String,
    pub avg_bikes: f64,
}

/// Number of distinct stations sharing one declared capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityBucket {
    pub capacity: u32,
    pub stations: u64,
}
