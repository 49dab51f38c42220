//! Append-only CSV snapshot store.
//!
//! Each scan re-reads the file, so a query sees every row committed by the
//! poller up to that moment.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::SnapshotStore;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// Opens a store at `path`. The file does not need to exist yet; a
    /// missing file reads as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `records` as rows, creating the file (with its header) and
    /// parent directories on first write.
    ///
    /// Returns the number of rows written.
    pub fn append(&self, records: &[Snapshot]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating store directory {}", dir.display()))?;
        }

        let file_exists = self.path.exists();
        debug!(path = %self.path.display(), file_exists, rows = records.len(), "Appending snapshots");

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("opening store {}", self.path.display()))?;

        // Header only on the first write
        let mut writer = WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        Ok(records.len())
    }
}

impl SnapshotStore for CsvStore {
    #[tracing::instrument(level = "debug", skip(self, visit), fields(path = %self.path.display()))]
    fn scan(&self, visit: &mut dyn FnMut(&Snapshot)) -> Result<()> {
        if !self.path.exists() {
            debug!("Store file missing, reading as empty");
            return Ok(());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("opening store {}", self.path.display()))?;

        let mut rejected = 0usize;
        for result in reader.deserialize() {
            let record: Snapshot =
                result.with_context(|| format!("decoding row of {}", self.path.display()))?;
            if !record.is_valid() {
                rejected += 1;
                continue;
            }
            visit(&record);
        }

        if rejected > 0 {
            warn!(rejected, "Skipped snapshots without a station code");
        }

        Ok(())
    }
}
