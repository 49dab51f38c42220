//! Group-by over a snapshot store.
//!
//! Every aggregation query is a single pass that folds records into
//! [`GroupTotals`] keyed by whatever the query groups on. Groups come back
//! ordered by key, which keeps repeated queries over an unchanged store
//! identical.

use anyhow::Result;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::snapshot::Snapshot;
use crate::store::SnapshotStore;

/// Accumulators shared by every grouping query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTotals {
    pub snapshots: u64,
    pub bikes: u64,
    pub mechanical: u64,
    pub ebike: u64,
    /// Snapshots with no bike available.
    pub empty: u64,
    /// Snapshots with no dock available.
    pub full: u64,
}

impl GroupTotals {
    pub fn add(&mut self, s: &Snapshot) {
        self.snapshots += 1;
        self.bikes += u64::from(s.bikes_available);
        self.mechanical += u64::from(s.mechanical);
        self.ebike += u64::from(s.ebike);
        if s.is_empty_station() {
            self.empty += 1;
        }
        if s.is_full_station() {
            self.full += 1;
        }
    }

    pub fn avg_bikes(&self) -> f64 {
        if self.snapshots == 0 {
            0.0
        } else {
            self.bikes as f64 / self.snapshots as f64
        }
    }
}

/// Groups every record of `store` by `key`.
///
/// Records whose key is `None` are dropped: an absent grouping key has no
/// display value.
pub fn group_by<S, K, F>(store: &S, key: F) -> Result<Vec<(K, GroupTotals)>>
where
    S: SnapshotStore + ?Sized,
    K: Ord,
    F: Fn(&Snapshot) -> Option<K>,
{
    let mut groups: BTreeMap<K, GroupTotals> = BTreeMap::new();

    store.scan(&mut |s| {
        if let Some(k) = key(s) {
            groups.entry(k).or_default().add(s);
        }
    })?;

    Ok(groups.into_iter().collect())
}

/// Totals over the whole store, or `None` when it holds no records.
pub fn total<S>(store: &S) -> Result<Option<GroupTotals>>
where
    S: SnapshotStore + ?Sized,
{
    let mut groups = group_by(store, |_| Some(()))?;
    Ok(groups.pop().map(|(_, totals)| totals))
}

/// Stable descending sort on a float key, then truncation to `limit`.
pub fn top_by<T, F>(mut rows: Vec<T>, limit: usize, key: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    rows.sort_by(|a, b| descending(key(a), key(b)));
    rows.truncate(limit);
    rows
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
