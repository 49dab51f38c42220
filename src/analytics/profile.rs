//! Calendar profiles of the network-wide series: how the fleet size varies
//! with the hour of day and the day of week.

use chrono::{Datelike, Timelike};
use std::collections::BTreeMap;

use crate::analytics::types::{
    HourProfile, ProfileRow, TimeSeriesPoint, WeekPartProfile, WeekdayProfile,
};
use crate::analytics::utility::mean;

const DAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Mean total bikes per hour of day, for the hours present in `points`.
pub fn hourly_profile(points: &[TimeSeriesPoint]) -> Vec<HourProfile> {
    bucket_means(points, |p| p.timestamp.hour())
        .into_iter()
        .map(|(hour, avg_bikes)| HourProfile { hour, avg_bikes })
        .collect()
}

/// Mean total bikes per day of week (0 = Monday).
pub fn weekday_profile(points: &[TimeSeriesPoint]) -> Vec<WeekdayProfile> {
    bucket_means(points, |p| p.timestamp.weekday().num_days_from_monday())
        .into_iter()
        .map(|(weekday, avg_bikes)| WeekdayProfile {
            weekday,
            day: DAY_LABELS[weekday as usize],
            avg_bikes,
        })
        .collect()
}

/// Mean total bikes on weekdays versus weekends.
pub fn week_part_profile(points: &[TimeSeriesPoint]) -> Vec<WeekPartProfile> {
    bucket_means(points, |p| {
        u8::from(p.timestamp.weekday().num_days_from_monday() >= 5)
    })
    .into_iter()
    .map(|(is_weekend, avg_bikes)| WeekPartProfile {
        is_weekend,
        label: if is_weekend == 1 { "weekend" } else { "weekday" },
        avg_bikes,
    })
    .collect()
}

/// Stacks the three profiles into one table, hourly rows first.
pub fn profile_rows(
    hourly: &[HourProfile],
    weekday: &[WeekdayProfile],
    week_part: &[WeekPartProfile],
) -> Vec<ProfileRow> {
    let hours = hourly.iter().map(|p| ProfileRow {
        profile: "hourly",
        bucket: p.hour,
        label: format!("{:02}:00", p.hour),
        avg_bikes: p.avg_bikes,
    });
    let days = weekday.iter().map(|p| ProfileRow {
        profile: "weekday",
        bucket: p.weekday,
        label: p.day.to_string(),
        avg_bikes: p.avg_bikes,
    });
    let parts = week_part.iter().map(|p| ProfileRow {
        profile: "week_part",
        bucket: u32::from(p.is_weekend),
        label: p.label.to_string(),
        avg_bikes: p.avg_bikes,
    });
    hours.chain(days).chain(parts).collect()
}

fn bucket_means<K, F>(points: &[TimeSeriesPoint], key: F) -> Vec<(K, f64)>
where
    K: Ord,
    F: Fn(&TimeSeriesPoint) -> K,
{
    let mut buckets: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for p in points {
        buckets.entry(key(p)).or_default().push(p.total_bikes as f64);
    }
    buckets
        .into_iter()
        .map(|(k, values)| (k, mean(&values)))
        .collect()
}
