//! CLI entry point for the next-buses tool.
//!
//! Provides subcommands for listing upcoming departures near a point,
//! inspecting which services run on a date, and listing nearby stops.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use next_buses::{
    Feed, QueryConfig, ResolveError,
    calendar::active_services_on,
    config::parse_timezone,
    next_buses,
    output::{append_records, to_json, write_text},
    proximity::{approx_distance_km, select_close_stops},
    time::today_in,
};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "next_buses")]
#[command(about = "Which buses pass near me, and when, today?", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List upcoming departures at stops near a point
    Next {
        /// Directory containing the GTFS .txt files
        #[arg(value_name = "GTFS_DIR")]
        gtfs_dir: PathBuf,

        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        lon: f64,

        /// Service date (YYYY-MM-DD), defaults to today in the configured timezone
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Override the proximity threshold in kilometers
        #[arg(long)]
        threshold_km: Option<f64>,

        /// Override the timezone (IANA name, e.g. "Europe/Paris")
        #[arg(long)]
        timezone: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// CSV file to append results to (required with --format csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the services running on a date
    Services {
        /// Directory containing the GTFS .txt files
        #[arg(value_name = "GTFS_DIR")]
        gtfs_dir: PathBuf,

        /// Service date (YYYY-MM-DD), defaults to today in the configured timezone
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Override the timezone (IANA name, e.g. "Europe/Paris")
        #[arg(long)]
        timezone: Option<String>,
    },
    /// List the stops near a point with their distance
    Stops {
        /// Directory containing the GTFS .txt files
        #[arg(value_name = "GTFS_DIR")]
        gtfs_dir: PathBuf,

        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        lon: f64,

        /// Override the proximity threshold in kilometers
        #[arg(long)]
        threshold_km: Option<f64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
    Csv,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/next_buses.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("next_buses.log"));

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

    match cli.command {
        Commands::Next {
            gtfs_dir,
            lat,
            lon,
            date,
            threshold_km,
            timezone,
            format,
            output,
        } => {
            let config = query_config(threshold_km, timezone.as_deref())?;
            let date = date.unwrap_or_else(|| today_in(config.timezone));
            let feed = load_feed(&gtfs_dir)?;

            let sightings =
                next_buses(&feed, lat, lon, date, &config).map_err(describe_resolve_error)?;
            if sightings.is_empty() {
                warn!(lat, lon, %date, "No buses found near the query point");
            }

            match format {
                Format::Text => {
                    let mut stdout = std::io::stdout().lock();
                    write_text(&mut stdout, &sightings)?;
                }
                Format::Json => {
                    println!("{}", to_json(&sightings)?);
                }
                Format::Csv => {
                    let Some(path) = output else {
                        bail!("--output is required with --format csv");
                    };
                    append_records(&path, &sightings)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), rows = sightings.len(), "Sightings appended");
                }
            }
        }
        Commands::Services {
            gtfs_dir,
            date,
            timezone,
        } => {
            let config = query_config(None, timezone.as_deref())?;
            let date = date.unwrap_or_else(|| today_in(config.timezone));
            let feed = load_feed(&gtfs_dir)?;

            let active = active_services_on(&feed.calendars, &feed.calendar_dates, date)
                .map_err(describe_resolve_error)?;
            let mut active: Vec<&str> = active.into_iter().collect();
            active.sort_unstable();

            info!(%date, count = active.len(), "Active services");
            let mut stdout = std::io::stdout().lock();
            for service_id in active {
                writeln!(stdout, "{service_id}")?;
            }
        }
        Commands::Stops {
            gtfs_dir,
            lat,
            lon,
            threshold_km,
        } => {
            let config = query_config(threshold_km, None)?;
            let feed = load_feed(&gtfs_dir)?;

            let mut close: Vec<_> = select_close_stops(&feed.stops, lat, lon, &config)
                .into_values()
                .map(|stop| (approx_distance_km(stop, lat, lon, config.degrees_per_km), stop))
                .collect();
            close.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

            let mut stdout = std::io::stdout().lock();
            for (distance_km, stop) in close {
                writeln!(stdout, "{}\t{:.3} km", stop.id, distance_km)?;
            }
        }
    }

    Ok(())
}

/// Environment configuration with any command-line overrides applied.
fn query_config(threshold_km: Option<f64>, timezone: Option<&str>) -> Result<QueryConfig> {
    let mut config = QueryConfig::from_env()?;
    if let Some(threshold_km) = threshold_km {
        config = config.with_threshold_km(threshold_km)?;
    }
    if let Some(timezone) = timezone {
        config = config.with_timezone(parse_timezone(timezone)?);
    }
    Ok(config)
}

fn load_feed(dir: &Path) -> Result<Feed> {
    Feed::load(dir).with_context(|| format!("loading GTFS feed from {}", dir.display()))
}

/// Labels corrupt-feed failures so they read differently from an empty result.
fn describe_resolve_error(err: ResolveError) -> anyhow::Error {
    if err.is_integrity_violation() {
        anyhow::Error::new(err).context("feed is corrupt")
    } else {
        err.into()
    }
}
