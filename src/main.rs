//! CLI entry point for the Vélib statistics tool.
//!
//! Provides subcommands for polling the live availability feed, synthesizing
//! a history from one snapshot, querying aggregate statistics and fitting
//! short-horizon forecasts over the stored snapshots.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use velib_stats::analytics::aggregate::{
    DEFAULT_LIMIT, all_stations, capacity_distribution, global_types, latest_stations,
    station_codes, station_emptiness, stats_by_commune, timeseries_for_station,
    timeseries_total_bikes, top_stations,
};
use velib_stats::analytics::profile::{
    hourly_profile, profile_rows, week_part_profile, weekday_profile,
};
use velib_stats::analytics::types::StationSort;
use velib_stats::fetch::BasicClient;
use velib_stats::forecast::{ForecastOutcome, ForestConfig, global_forecast, station_forecast};
use velib_stats::ingest::{DEFAULT_FEED_URL, fetch_and_store};
use velib_stats::output::{write_csv, write_json};
use velib_stats::store::{CsvStore, SnapshotStore};
use velib_stats::synth::{SynthPlan, load_base_snapshot, synthesize};

#[derive(Parser)]
#[command(name = "velib_stats")]
#[command(about = "Bike-share availability statistics and forecasts", long_about = None)]
struct Cli {
    /// CSV file holding the stored snapshots
    #[arg(
        long,
        global = true,
        env = "VELIB_STORE_PATH",
        default_value = "data/stations_status.csv"
    )]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the live availability feed and append each capture to the store
    Ingest {
        /// Feed URL
        #[arg(long, env = "VELIB_API_URL", default_value = DEFAULT_FEED_URL)]
        url: String,

        /// Sample rate: query the feed every X seconds
        #[arg(short = 'r', long, default_value_t = 300)]
        sample_rate: u64,

        /// Number of samples to collect (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        num_samples: usize,
    },
    /// Replay one snapshot file over a range of capture times
    Synthesize {
        /// JSON file with the base snapshot (record array or API envelope)
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,

        /// First capture time (RFC 3339)
        #[arg(long, default_value = "2025-01-01T08:00:00Z")]
        start: DateTime<Utc>,

        /// Number of capture times
        #[arg(long, default_value_t = 10)]
        steps: usize,

        /// Minutes between capture times
        #[arg(long, default_value_t = 60)]
        step_minutes: i64,
    },
    /// Query aggregate statistics over the stored snapshots
    Stats {
        #[arg(value_enum)]
        query: Query,

        /// Maximum rows for ranking queries
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Ranking key for top-stations
        #[arg(long, value_enum, default_value_t = SortKey::Avg)]
        sort: SortKey,

        /// Restrict timeseries to one station code
        #[arg(long)]
        station: Option<String>,

        /// Use only the most recent snapshot of each station (stations, capacity)
        #[arg(long, default_value_t = false)]
        latest: bool,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Fit forecasts and predict the next point
    Forecast {
        /// Forecast one station instead of the whole network
        #[arg(long)]
        station: Option<String>,

        /// Trees in the random forest
        #[arg(long, default_value_t = 200)]
        trees: usize,

        /// Random forest seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Query {
    Types,
    Communes,
    TopStations,
    Stations,
    Emptiness,
    Timeseries,
    Profile,
    Capacity,
    StationCodes,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SortKey {
    Avg,
    Sum,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/velib_stats.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("velib_stats.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let store = CsvStore::open(&cli.store);

    match cli.command {
        Commands::Ingest {
            url,
            sample_rate,
            num_samples,
        } => {
            ingest(&store, &url, sample_rate, num_samples).await?;
        }
        Commands::Synthesize {
            snapshot,
            start,
            steps,
            step_minutes,
        } => {
            let records = load_base_snapshot(&snapshot)?;
            info!(stations = records.len(), "Base snapshot loaded");

            let plan = SynthPlan {
                start,
                steps,
                step: Duration::try_minutes(step_minutes)
                    .with_context(|| format!("--step-minutes {step_minutes} is out of range"))?,
            };
            let history = synthesize(&records, &plan)?;
            if history.is_empty() {
                warn!("Nothing to insert");
            } else {
                let written = store.append(&history)?;
                info!(written, store = %store.path().display(), "Synthetic history stored");
            }
        }
        Commands::Stats {
            query,
            limit,
            sort,
            station,
            latest,
            format,
        } => {
            let sort = match sort {
                SortKey::Avg => StationSort::Avg,
                SortKey::Sum => StationSort::Sum,
            };
            run_query(&store, query, limit, sort, station.as_deref(), latest, format)?;
        }
        Commands::Forecast {
            station,
            trees,
            seed,
            format,
        } => match station {
            Some(code) => {
                let outcome = station_forecast(&store, &code)?;
                emit_forecast(&outcome, format, |f| write_csv(std::io::stdout().lock(), &f.history))?;
            }
            None => {
                let config = ForestConfig {
                    n_estimators: trees,
                    seed,
                    ..Default::default()
                };
                let outcome = global_forecast(&store, &config)?;
                emit_forecast(&outcome, format, |f| write_csv(std::io::stdout().lock(), &f.history))?;
            }
        },
    }

    Ok(())
}

/// Polls the feed every `sample_rate` seconds, `num_samples` times (0 = forever).
/// A failed round is logged and the next one still runs.
#[tracing::instrument(skip(store), fields(store = %store.path().display()))]
async fn ingest(store: &CsvStore, url: &str, sample_rate: u64, num_samples: usize) -> Result<()> {
    let client = BasicClient::new()?;

    if num_samples == 0 {
        info!(sample_rate, "Sampling infinitely. Press Ctrl+C to stop.");
    } else {
        info!(num_samples, sample_rate, "Starting sample collection");
    }

    let mut sample_count = 0;
    loop {
        if num_samples > 0 && sample_count >= num_samples {
            break;
        }
        sample_count += 1;

        match fetch_and_store(&client, url, store).await {
            Ok(batch) => info!(
                sample = sample_count,
                stations = batch.snapshots.len(),
                "Sample stored"
            ),
            Err(e) => error!(sample = sample_count, error = %e, "Sample failed"),
        }

        if num_samples == 0 || sample_count < num_samples {
            tokio::time::sleep(tokio::time::Duration::from_secs(sample_rate)).await;
        }
    }

    info!(sample_count, "Finished sampling");
    Ok(())
}

fn run_query(
    store: &CsvStore,
    query: Query,
    limit: usize,
    sort: StationSort,
    station: Option<&str>,
    latest: bool,
    format: Format,
) -> Result<()> {
    match query {
        Query::Types => match global_types(store)? {
            Some(split) => emit(&[split], format),
            None => {
                info!("No data yet");
                Ok(())
            }
        },
        Query::Communes => emit(&stats_by_commune(store, limit)?, format),
        Query::TopStations => emit(&top_stations(store, limit, sort)?, format),
        Query::Stations if latest => emit(&latest_stations(store)?, format),
        Query::Stations => emit(&all_stations(store)?, format),
        Query::Emptiness => emit(&station_emptiness(store, limit)?, format),
        Query::Timeseries => match station {
            Some(code) => emit(&timeseries_for_station(store, code)?, format),
            None => emit(&timeseries_total_bikes(store)?, format),
        },
        Query::Profile => {
            let points = timeseries_total_bikes(store)?;
            let hourly = hourly_profile(&points);
            let weekday = weekday_profile(&points);
            let week_part = week_part_profile(&points);
            match format {
                Format::Json => {
                    #[derive(Serialize)]
                    struct Profiles<A, B, C> {
                        hourly: A,
                        weekday: B,
                        week_part: C,
                    }
                    write_json(
                        std::io::stdout().lock(),
                        &Profiles {
                            hourly,
                            weekday,
                            week_part,
                        },
                    )
                }
                Format::Csv => write_csv(
                    std::io::stdout().lock(),
                    &profile_rows(&hourly, &weekday, &week_part),
                ),
            }
        }
        Query::Capacity if latest => {
            let current = store.snapshot_all()?.latest_only();
            emit(&capacity_distribution(&current)?, format)
        }
        Query::Capacity => emit(&capacity_distribution(store)?, format),
        Query::StationCodes => emit(&station_codes(store)?, format),
    }
}

fn emit<T: Serialize>(rows: &[T], format: Format) -> Result<()> {
    if rows.is_empty() {
        info!("No data yet");
    }
    let out = std::io::stdout().lock();
    match format {
        Format::Json => write_json(out, rows),
        Format::Csv => write_csv(out, rows),
    }
}

fn emit_forecast<T, F>(outcome: &ForecastOutcome<T>, format: Format, history_csv: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> Result<()>,
{
    if let ForecastOutcome::InsufficientData { required, actual } = outcome {
        warn!(required, actual, "No forecast available: not enough data points");
    }

    match (format, outcome) {
        (Format::Json, _) => write_json(std::io::stdout().lock(), outcome),
        (Format::Csv, ForecastOutcome::Ready(forecast)) => history_csv(forecast),
        (Format::Csv, ForecastOutcome::InsufficientData { .. }) => Ok(()),
    }
}
