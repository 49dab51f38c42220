//! Ingestion of live availability snapshots.
//!
//! One fetch yields one capture: every record of the payload is stamped with
//! the same fetch time before it is appended to the store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::fetch::{HttpClient, fetch_bytes};
use crate::snapshot::{ApiPayload, ApiRecord, Snapshot};
use crate::store::CsvStore;

/// Paris open-data real-time availability endpoint.
pub const DEFAULT_FEED_URL: &str = "https://opendata.paris.fr/api/explore/v2.1/catalog/datasets/velib-disponibilite-en-temps-reel/records?limit=20";

/// Snapshots from one capture.
#[derive(Debug, Clone)]
pub struct IngestBatch {
    pub captured_at: DateTime<Utc>,
    pub snapshots: Vec<Snapshot>,
    /// Records dropped for lacking a station code.
    pub rejected: usize,
}

/// Stamps every record with `captured_at`, dropping the ones without a
/// station code.
pub fn stamp(records: Vec<ApiRecord>, captured_at: DateTime<Utc>) -> IngestBatch {
    let total = records.len();
    let snapshots: Vec<Snapshot> = records
        .into_iter()
        .filter_map(|r| Snapshot::from_api(r, captured_at))
        .collect();

    IngestBatch {
        captured_at,
        rejected: total - snapshots.len(),
        snapshots,
    }
}

/// Decodes a feed payload (`{"total_count", "results"}`) into one capture.
pub fn parse_payload(bytes: &[u8], captured_at: DateTime<Utc>) -> Result<IngestBatch> {
    let payload: ApiPayload =
        serde_json::from_slice(bytes).context("decoding availability payload")?;
    Ok(stamp(payload.results, captured_at))
}

/// Fetches the feed once and appends the capture to `store`.
#[tracing::instrument(skip(client, store), fields(store = %store.path().display()))]
pub async fn fetch_and_store<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    store: &CsvStore,
) -> Result<IngestBatch> {
    let body = fetch_bytes(client, url).await?;
    let batch = parse_payload(&body, Utc::now()).with_context(|| format!("feed {url}"))?;

    if batch.rejected > 0 {
        warn!(rejected = batch.rejected, "Dropped records without a station code");
    }

    if batch.snapshots.is_empty() {
        info!("No records received");
    } else {
        let written = store.append(&batch.snapshots)?;
        info!(written, captured_at = %batch.captured_at, "Snapshots stored");
    }

    Ok(batch)
}
