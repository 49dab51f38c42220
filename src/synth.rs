//! Synthetic history: replays one availability snapshot over a range of
//! capture times so the analytics have a series to work on before the poller
//! has collected one.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::snapshot::{ApiPayload, ApiRecord, Snapshot};

/// Capture times to generate: `steps` instants from `start`, `step` apart.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthPlan {
    pub start: DateTime<Utc>,
    pub steps: usize,
    pub step: Duration,
}

impl Default for SynthPlan {
    fn default() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).single().unwrap_or_default(),
            steps: 10,
            step: Duration::hours(1),
        }
    }
}

impl SynthPlan {
    /// # Errors
    ///
    /// Returns an error when a capture time falls outside the representable
    /// date range.
    pub fn timestamps(&self) -> Result<Vec<DateTime<Utc>>> {
        (0..self.steps)
            .map(|i| {
                let offset = i32::try_from(i)
                    .ok()
                    .and_then(|i| self.step.checked_mul(i))
                    .with_context(|| format!("offset of step {i} overflows"))?;
                self.start
                    .checked_add_signed(offset)
                    .with_context(|| format!("capture time of step {i} is out of range"))
            })
            .collect()
    }
}

/// Base snapshot files come either as a bare record array (dataset export)
/// or wrapped in the API envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum BaseFile {
    Records(Vec<ApiRecord>),
    Payload(ApiPayload),
}

/// Reads a base snapshot from a JSON file.
pub fn load_base_snapshot(path: &Path) -> Result<Vec<ApiRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading base snapshot {}", path.display()))?;
    let base: BaseFile = serde_json::from_str(&content)
        .with_context(|| format!("decoding base snapshot {}", path.display()))?;

    Ok(match base {
        BaseFile::Records(records) => records,
        BaseFile::Payload(payload) => payload.results,
    })
}

/// One copy of every usable record per planned capture time.
pub fn synthesize(records: &[ApiRecord], plan: &SynthPlan) -> Result<Vec<Snapshot>> {
    let timestamps = plan.timestamps()?;
    let base: Vec<Snapshot> = records
        .iter()
        .filter_map(|r| Snapshot::from_api(r.clone(), plan.start))
        .collect();

    let history: Vec<Snapshot> = timestamps
        .into_iter()
        .flat_map(|ts| base.iter().map(move |s| s.at(ts)))
        .collect();

    info!(
        stations = base.len(),
        steps = plan.steps,
        documents = history.len(),
        "Synthetic history generated"
    );
    Ok(history)
}
