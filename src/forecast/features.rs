//! Temporal features derived from a time-ordered series.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;

use crate::analytics::types::TimeSeriesPoint;

/// Model inputs for one point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureRow {
    /// Position in the series, starting at 0. Gaps in sampling are not
    /// interpolated.
    pub t: usize,
    pub hour: u32,
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: u32,
    pub is_weekend: u8,
}

impl FeatureRow {
    pub fn from_timestamp(t: usize, timestamp: DateTime<Utc>) -> Self {
        let weekday = timestamp.weekday().num_days_from_monday();
        FeatureRow {
            t,
            hour: timestamp.hour(),
            weekday,
            is_weekend: u8::from(weekday >= 5),
        }
    }

    /// Features for position `t` that keep this row's calendar context.
    ///
    /// Used for the step past the end of a series: the next sample is assumed
    /// to share the last observed hour and weekday rather than advancing by
    /// the sampling interval.
    pub fn repeat_calendar_at(&self, t: usize) -> Self {
        FeatureRow { t, ..*self }
    }

    /// Model input in the order `[t, hour, weekday, is_weekend]`.
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.t as f64,
            f64::from(self.hour),
            f64::from(self.weekday),
            f64::from(self.is_weekend),
        ]
    }
}

/// Derives features for every point, in input order.
///
/// `points` must already be sorted by timestamp; nothing is filtered here.
pub fn derive_features(points: &[TimeSeriesPoint]) -> Vec<FeatureRow> {
    points
        .iter()
        .enumerate()
        .map(|(t, p)| FeatureRow::from_timestamp(t, p.timestamp))
        .collect()
}
