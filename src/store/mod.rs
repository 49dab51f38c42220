//! Snapshot storage.
//!
//! The aggregation and forecasting code only ever reads through
//! [`SnapshotStore`]; it never writes. [`CsvStore`] is the append-only file
//! the poller writes to, [`MemoryStore`] holds filtered subsets and test data.

mod csv_file;
mod memory;

pub use csv_file::CsvStore;
pub use memory::MemoryStore;

use anyhow::Result;

use crate::snapshot::Snapshot;

/// Read access to a collection of snapshot records.
pub trait SnapshotStore {
    /// Visits every committed record, in storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn scan(&self, visit: &mut dyn FnMut(&Snapshot)) -> Result<()>;

    /// Copies the records matching `predicate` into a new in-memory store.
    fn filter(&self, predicate: &dyn Fn(&Snapshot) -> bool) -> Result<MemoryStore> {
        let mut subset = Vec::new();
        self.scan(&mut |s| {
            if predicate(s) {
                subset.push(s.clone());
            }
        })?;
        Ok(MemoryStore::new(subset))
    }

    /// Loads every record into memory.
    fn snapshot_all(&self) -> Result<MemoryStore> {
        self.filter(&|_| true)
    }
}
