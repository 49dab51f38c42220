use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;
use velib_stats::analytics::aggregate::{
    DEFAULT_LIMIT, global_types, latest_stations, station_emptiness, stats_by_commune,
    timeseries_total_bikes,
};
use velib_stats::forecast::{ForecastOutcome, ForestConfig, global_forecast, station_forecast};
use velib_stats::ingest::parse_payload;
use velib_stats::snapshot::ApiRecord;
use velib_stats::store::CsvStore;
use velib_stats::synth::{SynthPlan, synthesize};

#[test]
fn test_full_pipeline_over_csv_store() {
    let dir = TempDir::new().unwrap();
    let store = CsvStore::open(dir.path().join("stations_status.csv"));

    // Four hourly captures, two stations, network total 10, 12, 14, 16
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
    for (i, (a, b)) in [(4, 6), (5, 7), (6, 8), (7, 9)].into_iter().enumerate() {
        let body = format!(
            r#"{{"total_count": 2, "results": [
                {{"stationcode": "16107", "name": "Benjamin Godard", "nom_arrondissement_communes": "Paris",
                  "mechanical": {a}, "ebike": 0, "numbikesavailable": {a}, "numdocksavailable": 10}},
                {{"stationcode": "31104", "name": "Mairie de Rosny", "nom_arrondissement_communes": "Rosny-sous-Bois",
                  "mechanical": 0, "ebike": {b}, "numbikesavailable": {b}, "numdocksavailable": 0}}
            ]}}"#
        );
        let batch = parse_payload(body.as_bytes(), start + Duration::hours(i as i64)).unwrap();
        store.append(&batch.snapshots).unwrap();
    }

    let split = global_types(&store).unwrap().unwrap();
    assert_eq!(split.total_mech, 22);
    assert_eq!(split.total_ebike, 30);

    let communes = stats_by_commune(&store, DEFAULT_LIMIT).unwrap();
    assert_eq!(communes[0].commune, "Rosny-sous-Bois");
    assert_eq!(communes[0].sum_bikes, 30);

    let emptiness = station_emptiness(&store, DEFAULT_LIMIT).unwrap();
    let rosny = emptiness.iter().find(|r| r.station_code == "31104").unwrap();
    assert_eq!(rosny.pct_full, 100.0);
    assert_eq!(rosny.pct_empty, 0.0);

    let latest = latest_stations(&store).unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].bikes_available, 7);

    let series = timeseries_total_bikes(&store).unwrap();
    let totals: Vec<u64> = series.iter().map(|p| p.total_bikes).collect();
    assert_eq!(totals, vec![10, 12, 14, 16]);

    let forecast = global_forecast(&store, &ForestConfig::default())
        .unwrap()
        .ready()
        .unwrap();
    assert!(forecast.rmse_lin < 1e-6);
    assert!((forecast.next_pred_lin - 18.0).abs() < 1e-6);

    let station = station_forecast(&store, "16107").unwrap().ready().unwrap();
    assert!((station.next_pred - 8.0).abs() < 1e-6);
}

#[test]
fn test_empty_store_yields_empty_results_and_sentinel() {
    let dir = TempDir::new().unwrap();
    let store = CsvStore::open(dir.path().join("never_written.csv"));

    assert!(global_types(&store).unwrap().is_none());
    assert!(stats_by_commune(&store, DEFAULT_LIMIT).unwrap().is_empty());
    assert!(timeseries_total_bikes(&store).unwrap().is_empty());

    let outcome = global_forecast(&store, &ForestConfig::default()).unwrap();
    assert_eq!(
        outcome,
        ForecastOutcome::InsufficientData {
            required: 3,
            actual: 0
        }
    );
}

#[test]
fn test_synthetic_constant_history_forecasts_constant() {
    let dir = TempDir::new().unwrap();
    let store = CsvStore::open(dir.path().join("synthetic.csv"));

    let base = vec![ApiRecord {
        stationcode: Some("1".to_string()),
        numbikesavailable: Some(9),
        mechanical: Some(9),
        ..Default::default()
    }];
    let plan = SynthPlan {
        steps: 3,
        ..Default::default()
    };
    store.append(&synthesize(&base, &plan).unwrap()).unwrap();

    let forecast = global_forecast(&store, &ForestConfig::default())
        .unwrap()
        .ready()
        .unwrap();
    assert!((forecast.next_pred_lin - 9.0).abs() < 1e-6);
    assert!((forecast.next_pred_rf - 9.0).abs() < 1e-6);
}
