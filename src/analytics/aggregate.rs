use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::analytics::group::{group_by, top_by, total};
use crate::analytics::types::{
    CapacityBucket, CommuneStats, StationEmptiness, StationRow, StationSort, StationStats,
    TimeSeriesPoint, TypeSplit,
};
use crate::analytics::utility::pct;
use crate::snapshot::Snapshot;
use crate::store::{MemoryStore, SnapshotStore};

/// Default row limit of the ranking queries.
pub const DEFAULT_LIMIT: usize = 10;

/// Sums mechanical bikes and e-bikes over every record.
///
/// Returns `None` for an empty store.
pub fn global_types<S: SnapshotStore + ?Sized>(store: &S) -> Result<Option<TypeSplit>> {
    Ok(total(store)?.map(|t| TypeSplit {
        total_mech: t.mechanical,
        total_ebike: t.ebike,
    }))
}

/// Average and total available bikes per commune, largest total first.
///
/// Records without a commune are left out.
pub fn stats_by_commune<S: SnapshotStore + ?Sized>(
    store: &S,
    limit: usize,
) -> Result<Vec<CommuneStats>> {
    let rows: Vec<CommuneStats> = group_by(store, |s| s.commune.clone())?
        .into_iter()
        .map(|(commune, t)| CommuneStats {
            commune,
            avg_bikes: t.avg_bikes(),
            sum_bikes: t.bikes,
        })
        .collect();

    Ok(top_by(rows, limit, |r| r.sum_bikes as f64))
}

/// Average and total available bikes per station, ranked by `sort`.
pub fn top_stations<S: SnapshotStore + ?Sized>(
    store: &S,
    limit: usize,
    sort: StationSort,
) -> Result<Vec<StationStats>> {
    let rows: Vec<StationStats> = group_by(store, station_key)?
        .into_iter()
        .map(|((station_code, name), t)| StationStats {
            station_code,
            name,
            avg_bikes: t.avg_bikes(),
            sum_bikes: t.bikes,
        })
        .collect();

    Ok(match sort {
        StationSort::Avg => top_by(rows, limit, |r| r.avg_bikes),
        StationSort::Sum => top_by(rows, limit, |r| r.sum_bikes as f64),
    })
}

/// One row per stored record, in storage order.
///
/// Nothing is grouped: against a store holding history, each station appears
/// once per capture. Use [`latest_stations`] for the current state of each
/// station.
pub fn all_stations<S: SnapshotStore + ?Sized>(store: &S) -> Result<Vec<StationRow>> {
    let mut rows = Vec::new();
    store.scan(&mut |s| rows.push(station_row(s)))?;
    Ok(rows)
}

/// One row per station, taken from its most recent snapshot.
pub fn latest_stations<S: SnapshotStore + ?Sized>(store: &S) -> Result<Vec<StationRow>> {
    let latest = store.snapshot_all()?.latest_only();
    all_stations(&latest)
}

/// Share of snapshots in which each station had no bike (`pct_empty`) or no
/// free dock (`pct_full`), most often empty first.
pub fn station_emptiness<S: SnapshotStore + ?Sized>(
    store: &S,
    limit: usize,
) -> Result<Vec<StationEmptiness>> {
    let rows: Vec<StationEmptiness> = group_by(store, station_key)?
        .into_iter()
        .map(|((station_code, name), t)| StationEmptiness {
            station_code,
            name,
            total_snapshots: t.snapshots,
            pct_empty: pct(t.empty, t.snapshots),
            pct_full: pct(t.full, t.snapshots),
        })
        .collect();

    Ok(top_by(rows, limit, |r| r.pct_empty))
}

/// Total available bikes across the network at each capture time, oldest
/// first. Records without a timestamp are left out.
pub fn timeseries_total_bikes<S: SnapshotStore + ?Sized>(
    store: &S,
) -> Result<Vec<TimeSeriesPoint>> {
    series(store)
}

/// Available bikes at one station at each capture time, oldest first.
pub fn timeseries_for_station<S: SnapshotStore + ?Sized>(
    store: &S,
    station_code: &str,
) -> Result<Vec<TimeSeriesPoint>> {
    let station: MemoryStore = store.filter(&|s| s.station_code == station_code)?;
    debug!(station_code, records = station.len(), "Station slice loaded");
    series(&station)
}

/// Number of distinct stations per declared capacity, smallest capacity
/// first. Records without a capacity are left out.
///
/// A station seen under several capacities across the history counts once
/// in each of them.
pub fn capacity_distribution<S: SnapshotStore + ?Sized>(
    store: &S,
) -> Result<Vec<CapacityBucket>> {
    let pairs = group_by(store, |s| s.capacity.map(|c| (c, s.station_code.clone())))?;

    let mut counts: BTreeMap<u32, u64> = BTreeMap::new();
    for ((capacity, _), _) in pairs {
        *counts.entry(capacity).or_default() += 1;
    }

    Ok(counts
        .into_iter()
        .map(|(capacity, stations)| CapacityBucket { capacity, stations })
        .collect())
}

/// Sorted distinct station codes.
pub fn station_codes<S: SnapshotStore + ?Sized>(store: &S) -> Result<Vec<String>> {
    Ok(group_by(store, |s| Some(s.station_code.clone()))?
        .into_iter()
        .map(|(code, _)| code)
        .collect())
}

fn series<S: SnapshotStore + ?Sized>(store: &S) -> Result<Vec<TimeSeriesPoint>> {
    // BTreeMap ordering on the timestamp key gives ascending time
    let points = group_by(store, |s| s.timestamp)?
        .into_iter()
        .map(|(timestamp, t): (DateTime<Utc>, _)| TimeSeriesPoint {
            timestamp,
            total_bikes: t.bikes,
        })
        .collect();
    Ok(points)
}

fn station_key(s: &Snapshot) -> Option<(String, String)> {
    Some((s.station_code.clone(), s.name.clone()))
}

fn station_row(s: &Snapshot) -> StationRow {
    StationRow {
        station_code: s.station_code.clone(),
        name: s.name.clone(),
        bikes_available: s.bikes_available,
        mechanical: s.mechanical,
        ebike: s.ebike,
        lat: s.lat,
        lon: s.lon,
        commune: s.commune.clone(),
    }
}
