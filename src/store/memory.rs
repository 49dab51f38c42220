use anyhow::Result;
use std::collections::BTreeMap;

use super::SnapshotStore;
use crate::snapshot::Snapshot;

/// A store backed by a plain vector of records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<Snapshot>,
}

impl MemoryStore {
    pub fn new(records: Vec<Snapshot>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Snapshot] {
        &self.records
    }

    /// Keeps only the most recent snapshot of each station, ordered by
    /// station code.
    ///
    /// A timestamped record always beats an untimestamped one; on equal
    /// timestamps the record stored last wins.
    pub fn latest_only(&self) -> MemoryStore {
        let mut latest: BTreeMap<&str, &Snapshot> = BTreeMap::new();

        for record in &self.records {
            latest
                .entry(record.station_code.as_str())
                .and_modify(|current| {
                    if record.timestamp >= current.timestamp {
                        *current = record;
                    }
                })
                .or_insert(record);
        }

        MemoryStore::new(latest.into_values().cloned().collect())
    }
}

impl SnapshotStore for MemoryStore {
    fn scan(&self, visit: &mut dyn FnMut(&Snapshot)) -> Result<()> {
        self.records.iter().for_each(|r| visit(r));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    #[test]
    fn test_filter_returns_subset() {
        let store = MemoryStore::new(vec![
            snap("A", Some(at(8)), 1),
            snap("B", Some(at(8)), 2),
            snap("A", Some(at(9)), 3),
        ]);

        let subset = store.filter(&|s| s.station_code == "A").unwrap();

        assert_eq!(subset.len(), 2);
        assert!(subset.records().iter().all(|s| s.station_code == "A"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_latest_only_picks_newest_per_station() {
        let store = MemoryStore::new(vec![
            snap("B", Some(at(9)), 5),
            snap("A", Some(at(10)), 7),
            snap("A", Some(at(8)), 1),
            snap("B", None, 9),
        ]);

        let latest = store.latest_only();
        let records = latest.records();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].station_code, "A");
        assert_eq!(records[0].bikes_available, 7);
        assert_eq!(records[1].station_code, "B");
        assert_eq!(records[1].bikes_available, 5);
    }

    #[test]
    fn test_latest_only_tie_keeps_last_stored() {
        let store = MemoryStore::new(vec![snap("A", Some(at(8)), 1), snap("A", Some(at(8)), 2)]);
        assert_eq!(store.latest_only().records()[0].bikes_available, 2);
    }

    #[test]
    fn test_empty_store() {
        let store = MemoryStore::default();
        assert!(store.is_empty());
        assert!(store.latest_only().is_empty());
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    fn snap(code: &str, timestamp: Option<DateTime<Utc>>, bikes: u32) -> Snapshot {
        Snapshot {
            station_code: code.to_string(),
            name: format!("Station {code}"),
            commune: None,
            lat: None,
            lon: None,
            mechanical: bikes,
            ebike: 0,
            bikes_available: bikes,
            docks_available: 10,
            capacity: None,
            timestamp,
        }
    }
}
