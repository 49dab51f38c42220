//! Short-horizon forecasts of available bikes.
//!
//! Each call fits fresh models on the series it is given, scores them on that
//! same history (in-sample RMSE) and extrapolates exactly one step past the
//! last point. Nothing is cached between calls.
//!
//! The extrapolated point uses `t = len(series)` but repeats the calendar
//! features (hour, weekday, weekend flag) of the last observation; it does
//! not advance the clock by the sampling interval. See
//! [`FeatureRow::repeat_calendar_at`].

pub mod features;
pub mod forest;
pub mod linear;

pub use features::{FeatureRow, derive_features};
pub use forest::{ForestConfig, RandomForest};
pub use linear::LinearRegression;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::analytics::aggregate::{timeseries_for_station, timeseries_total_bikes};
use crate::analytics::types::TimeSeriesPoint;
use crate::analytics::utility::rmse;
use crate::store::SnapshotStore;

/// Fewest points a forecast is attempted on.
pub const MIN_FORECAST_POINTS: usize = 3;

/// Result of a forecast request: a fitted forecast, or the marker that the
/// series was too short to fit anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome<T> {
    Ready(T),
    InsufficientData { required: usize, actual: usize },
}

impl<T> ForecastOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            ForecastOutcome::Ready(value) => Some(value),
            ForecastOutcome::InsufficientData { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ForecastOutcome::Ready(_))
    }
}

/// One historical point of the network-wide forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalHistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub t: usize,
    pub hour: u32,
    pub weekday: u32,
    pub is_weekend: u8,
    pub total_bikes: u64,
    pub pred_lin: f64,
    pub pred_rf: f64,
}

impl GlobalHistoryPoint {
    pub fn features(&self) -> FeatureRow {
        FeatureRow {
            t: self.t,
            hour: self.hour,
            weekday: self.weekday,
            is_weekend: self.is_weekend,
        }
    }
}

/// Linear and random-forest forecasts of the network-wide total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalForecast {
    pub history: Vec<GlobalHistoryPoint>,
    pub next_t: usize,
    pub next_features: FeatureRow,
    pub next_pred_lin: f64,
    pub next_pred_rf: f64,
    pub rmse_lin: f64,
    pub rmse_rf: f64,
}

/// One historical point of a single-station forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationHistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub t: usize,
    pub bikes: u64,
    pub pred: f64,
}

/// Linear trend forecast for one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationForecast {
    pub station_code: String,
    pub history: Vec<StationHistoryPoint>,
    pub next_t: usize,
    pub next_pred: f64,
    pub rmse: f64,
}

/// Forecasts the network-wide total read from `store`.
#[tracing::instrument(skip_all)]
pub fn global_forecast<S: SnapshotStore + ?Sized>(
    store: &S,
    config: &ForestConfig,
) -> Result<ForecastOutcome<GlobalForecast>> {
    let points = timeseries_total_bikes(store)?;
    forecast_series(&points, config)
}

/// Fits a linear model and a random forest on `[t, hour, weekday, is_weekend]`
/// of an ascending series and predicts one step ahead with both.
pub fn forecast_series(
    points: &[TimeSeriesPoint],
    config: &ForestConfig,
) -> Result<ForecastOutcome<GlobalForecast>> {
    if points.len() < MIN_FORECAST_POINTS {
        debug!(points = points.len(), "Series too short for a forecast");
        return Ok(insufficient(points.len()));
    }

    let rows = derive_features(points);
    let x: Vec<Vec<f64>> = rows.iter().map(FeatureRow::to_vec).collect();
    let y = targets(points);

    let lin = LinearRegression::fit(&x, &y)?;
    let rf = RandomForest::fit(&x, &y, config)?;

    let pred_lin = lin.predict(&x);
    let pred_rf = rf.predict(&x);
    let rmse_lin = rmse(&y, &pred_lin);
    let rmse_rf = rmse(&y, &pred_rf);

    let next_t = points.len();
    let next_features = rows[rows.len() - 1].repeat_calendar_at(next_t);
    let next_x = next_features.to_vec();
    let next_pred_lin = lin.predict_one(&next_x);
    let next_pred_rf = rf.predict_one(&next_x);

    info!(
        points = points.len(),
        rmse_lin, rmse_rf, next_pred_lin, next_pred_rf, "Global forecast fitted"
    );

    let history = points
        .iter()
        .zip(rows)
        .zip(pred_lin.into_iter().zip(pred_rf))
        .map(|((p, f), (pred_lin, pred_rf))| GlobalHistoryPoint {
            timestamp: p.timestamp,
            t: f.t,
            hour: f.hour,
            weekday: f.weekday,
            is_weekend: f.is_weekend,
            total_bikes: p.total_bikes,
            pred_lin,
            pred_rf,
        })
        .collect();

    Ok(ForecastOutcome::Ready(GlobalForecast {
        history,
        next_t,
        next_features,
        next_pred_lin,
        next_pred_rf,
        rmse_lin,
        rmse_rf,
    }))
}

/// Forecasts available bikes at one station read from `store`.
#[tracing::instrument(skip(store))]
pub fn station_forecast<S: SnapshotStore + ?Sized>(
    store: &S,
    station_code: &str,
) -> Result<ForecastOutcome<StationForecast>> {
    let points = timeseries_for_station(store, station_code)?;
    forecast_station_series(station_code, &points)
}

/// Fits a linear trend on the sequence index alone (no calendar features)
/// and predicts the next point.
pub fn forecast_station_series(
    station_code: &str,
    points: &[TimeSeriesPoint],
) -> Result<ForecastOutcome<StationForecast>> {
    if points.len() < MIN_FORECAST_POINTS {
        debug!(station_code, points = points.len(), "Series too short for a forecast");
        return Ok(insufficient(points.len()));
    }

    let x: Vec<Vec<f64>> = (0..points.len()).map(|t| vec![t as f64]).collect();
    let y = targets(points);

    let model = LinearRegression::fit(&x, &y)?;
    let pred = model.predict(&x);
    let rmse = rmse(&y, &pred);

    let next_t = points.len();
    let next_pred = model.predict_one(&[next_t as f64]);

    info!(station_code, points = points.len(), rmse, next_pred, "Station forecast fitted");

    let history = points
        .iter()
        .zip(pred)
        .enumerate()
        .map(|(t, (p, pred))| StationHistoryPoint {
            timestamp: p.timestamp,
            t,
            bikes: p.total_bikes,
            pred,
        })
        .collect();

    Ok(ForecastOutcome::Ready(StationForecast {
        station_code: station_code.to_string(),
        history,
        next_t,
        next_pred,
        rmse,
    }))
}

fn targets(points: &[TimeSeriesPoint]) -> Vec<f64> {
    points.iter().map(|p| p.total_bikes as f64).collect()
}

fn insufficient<T>(actual: usize) -> ForecastOutcome<T> {
    ForecastOutcome::InsufficientData {
        required: MIN_FORECAST_POINTS,
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const EPS: f64 = 1e-6;

    #[test]
    fn test_two_points_are_insufficient() {
        let points = hourly(&[10, 12]);

        let outcome = forecast_series(&points, &ForestConfig::default()).unwrap();
        assert_eq!(
            outcome,
            ForecastOutcome::InsufficientData {
                required: 3,
                actual: 2
            }
        );

        let station = forecast_station_series("A", &points).unwrap();
        assert!(!station.is_ready());
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let outcome = forecast_series(&[], &ForestConfig::default()).unwrap();
        assert_eq!(
            outcome,
            ForecastOutcome::InsufficientData {
                required: 3,
                actual: 0
            }
        );
    }

    #[test]
    fn test_constant_series_predicts_constant() {
        let points = hourly(&[25, 25, 25]);

        let forecast = forecast_series(&points, &ForestConfig::default())
            .unwrap()
            .ready()
            .unwrap();

        assert!((forecast.next_pred_lin - 25.0).abs() < EPS);
        assert!((forecast.next_pred_rf - 25.0).abs() < EPS);
        assert!(forecast.rmse_lin < EPS);
        assert!(forecast.rmse_rf < EPS);
    }

    #[test]
    fn test_linear_series_extrapolates() {
        let points = hourly(&[10, 12, 14, 16]);

        let forecast = forecast_series(&points, &ForestConfig::default())
            .unwrap()
            .ready()
            .unwrap();

        assert!(forecast.rmse_lin < EPS);
        assert!((forecast.next_pred_lin - 18.0).abs() < EPS);
        assert_eq!(forecast.next_t, 4);
        assert_eq!(forecast.history.len(), 4);
        assert!((forecast.history[2].pred_lin - 14.0).abs() < EPS);
        // the forest cannot extrapolate beyond the observed range
        assert!(forecast.next_pred_rf <= 16.0 + EPS);
    }

    #[test]
    fn test_next_features_repeat_last_calendar() {
        let points = hourly(&[10, 12, 14, 16]);

        let forecast = forecast_series(&points, &ForestConfig::default())
            .unwrap()
            .ready()
            .unwrap();

        let last = forecast.history[3].features();
        assert_eq!(forecast.next_features.t, 4);
        assert_eq!(forecast.next_features.hour, last.hour);
        assert_eq!(forecast.next_features.weekday, last.weekday);
        assert_eq!(forecast.next_features.is_weekend, last.is_weekend);
    }

    #[test]
    fn test_station_forecast_trend() {
        let points = hourly(&[3, 5, 7]);

        let forecast = forecast_station_series("16107", &points)
            .unwrap()
            .ready()
            .unwrap();

        assert_eq!(forecast.station_code, "16107");
        assert!((forecast.next_pred - 9.0).abs() < EPS);
        assert!(forecast.rmse < EPS);
        assert_eq!(forecast.history[1].t, 1);
        assert_eq!(forecast.history[1].bikes, 5);
    }

    #[test]
    fn test_outcome_serializes_with_status() {
        let outcome: ForecastOutcome<StationForecast> = ForecastOutcome::InsufficientData {
            required: 3,
            actual: 1,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["actual"], 1);
    }

    fn hourly(values: &[u64]) -> Vec<TimeSeriesPoint> {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| TimeSeriesPoint {
                timestamp: start + Duration::hours(i as i64),
                total_bikes: v,
            })
            .collect()
    }
}
