//! Site comfort ingester.
//!
//! One-shot runs meant to be triggered by an external scheduler: fetch
//! weather telemetry or gate traffic, persist it, derive comfort scores.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ingester::{
    Credentials, IngesterConfig, Ingestor, RunContext, RunReport, SensourceClient, TomorrowClient,
};
use ingestion::{TrafficGrouping, WeatherSchema};
use storage::Store;

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Weather, traffic and comfort score ingester")]
struct Args {
    /// Configuration file path (defaults are used when omitted)
    #[arg(short, long, env = "INGESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch weather telemetry into the raw store
    Weather {
        #[arg(long, value_enum, default_value = "realtime")]
        mode: WeatherMode,
    },
    /// Fetch gate traffic into the traffic store
    Traffic {
        #[arg(long, value_enum, default_value = "day")]
        grouping: Grouping,

        /// Last day of the requested window (default: today in the site zone)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Derive comfort scores from the raw store
    Score,
    /// Print gate statistics, interval flows and the newest scores as JSON
    Summary {
        #[arg(long, default_value = "24")]
        limit: i64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WeatherMode {
    Realtime,
    Forecast,
    History,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Grouping {
    Day,
    Interval,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = IngesterConfig::load(args.config.as_deref())?;
    info!(location = %config.site.location, timezone = %config.site.timezone, "Loaded configuration");

    let ctx = RunContext::new(config.site.timezone);
    let ingestor = Ingestor::new(config.clone())?;

    let report = match args.command {
        Command::Weather { mode } => {
            let credentials = Credentials::from_env();
            let http = ingester::sources::build_http_client(config.http.timeout_secs)?;
            let source = TomorrowClient::new(
                http,
                config.weather.base_url.as_str(),
                credentials.tomorrow()?,
                config.site.location.as_str(),
                config.site.units.as_str(),
                config.weather.history_days,
            );
            let schema = match mode {
                WeatherMode::Realtime => WeatherSchema::Realtime,
                WeatherMode::Forecast => WeatherSchema::Forecast {
                    timestep: config.weather.timestep,
                },
                WeatherMode::History => WeatherSchema::History,
            };

            let store = Store::open(&config.stores.raw).await?;
            ingestor.run_weather(&ctx, &source, &store, schema).await?
        }
        Command::Traffic { grouping, date } => {
            let credentials = Credentials::from_env();
            let http = ingester::sources::build_http_client(config.http.timeout_secs)?;
            let source = SensourceClient::new(http, config.traffic.base_url.as_str(), credentials.sensource()?);
            let grouping = match grouping {
                Grouping::Day => TrafficGrouping::Day,
                Grouping::Interval => TrafficGrouping::Interval,
            };
            let date = date.unwrap_or_else(|| ctx.zone.today());

            let store = Store::open(&config.stores.traffic).await?;
            ingestor.run_traffic(&ctx, &source, &store, grouping, date).await?
        }
        Command::Score => {
            let reader = Store::open_read_only(&config.stores.raw).await?;
            let derived = Store::open(&config.stores.derived).await?;
            ingestor.run_scoring(&ctx, &reader, &derived).await?
        }
        Command::Summary { limit } => {
            let traffic = Store::open_read_only(&config.stores.traffic).await?;
            let derived = Store::open_read_only(&config.stores.derived).await?;
            let summary = ingestor.summary(&traffic, &derived, limit).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
    };

    log_report(&report);
    Ok(())
}

fn log_report(report: &RunReport) {
    info!(
        run_id = %report.run_id,
        table = %report.table,
        records = report.records,
        written = report.written,
        "Ingester finished"
    );
}
