use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rainbow_forecast::{PipelineConfig, RainbowForecast, Target};
use std::path::PathBuf;
use tracing::info;

/// Daily weather forecasting per station, from raw observations to rainbow
/// and apparent-temperature scores.
#[derive(Parser, Debug)]
#[command(name = "rainbow-forecast", version, about)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download raw observations into the ingestion store
    Ingest,
    /// Fuse raw observations and physics data into the clean dataset
    Process,
    /// Train one model per target
    Train {
        /// Targets to train (tavg, tmin, tmax, tsun, rhum, wspd, rain). All by default.
        #[arg(short, long, value_delimiter = ',')]
        target: Vec<Target>,
    },
    /// One-step forecast of the target year plus heuristic scores
    Forecast,
    /// Recursive multi-day simulation
    Simulate {
        /// First simulated day (YYYY-MM-DD). Defaults to Jan 1 of the target year.
        #[arg(long)]
        cutoff: Option<NaiveDate>,
        /// Number of days to simulate.
        #[arg(long)]
        horizon: Option<usize>,
    },
    /// Compare the one-step and recursive forecasts
    Report,
    /// Run every stage in order
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let args = Args::parse();

    let config = PipelineConfig::load(args.config.as_deref())?;
    let pipeline = RainbowForecast::new(config).await?;

    match args.command {
        Command::Ingest => {
            let summary = pipeline.ingest().await?;
            info!(records = summary.records_saved, windows = summary.windows_with_data, "ingestion done");
        }
        Command::Process => {
            let output = pipeline.process().await?;
            info!(stations = output.series.len(), "clean dataset written");
        }
        Command::Train { target } => {
            let targets = if target.is_empty() { Target::ALL.to_vec() } else { target };
            let reports = pipeline.train().targets(targets).call().await?;
            for report in reports {
                info!(model = %report.target, diagnosis = %report.diagnosis, "{}", report.metrics);
            }
        }
        Command::Forecast => {
            let table = pipeline.forecast().await?;
            info!(rows = table.len(), "forecast written");
        }
        Command::Simulate { cutoff, horizon } => {
            let simulation = pipeline
                .simulate()
                .maybe_cutoff(cutoff)
                .maybe_horizon_days(horizon)
                .call()
                .await?;
            info!(rows = simulation.table.len(), "simulation written");
        }
        Command::Report => {
            pipeline.report().await?;
        }
        Command::All => {
            pipeline.run_all().await?;
        }
    }
    Ok(())
}

fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
