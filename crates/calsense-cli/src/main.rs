//! `calsense` CLI: plan, inspect, and run calendar-driven sensors.
//!
//! ## Usage
//!
//! ```sh
//! # Check a config file
//! calsense validate --config calendars.json
//!
//! # Print the live action timeline of every calendar
//! calsense plan --config calendars.json
//!
//! # Print the timeline of one calendar as of a given instant
//! calsense plan --config calendars.json --calendar Work --now 2026-03-02T08:00:00Z
//!
//! # Print sensor states
//! calsense status --config calendars.json
//!
//! # Run the timer-driven daemon until Ctrl-C
//! calsense run --config calendars.json --log-level debug
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use calsense::runtime::{self, CalendarTask};
use calsense::{
    load_config, Calendar, CalendarConfig, Config, LogSink, OccurrenceSource, RecordingSink,
    RefreshOutcome, SystemClock,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "calsense",
    version,
    about = "Calendar-driven on/off sensors"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON)
    #[arg(short, long, global = true, default_value = "calsense.json")]
    config: PathBuf,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the live action timeline as JSON
    Plan {
        /// Only this calendar
        #[arg(long)]
        calendar: Option<String>,
        /// Evaluate at this instant instead of now (RFC 3339)
        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,
    },
    /// Print the on/off state of every sensor as JSON
    Status {
        /// Only this calendar
        #[arg(long)]
        calendar: Option<String>,
        /// Evaluate at this instant instead of now (RFC 3339)
        #[arg(long, value_parser = parse_instant)]
        now: Option<DateTime<Utc>>,
    },
    /// Run the daemon until Ctrl-C
    Run,
    /// Load and validate the configuration
    Validate,
}

fn parse_instant(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    match cli.command {
        Commands::Validate => {
            println!("ok");
        }
        Commands::Plan { calendar, now } => {
            let now = now.unwrap_or_else(Utc::now);
            let mut out = Map::new();
            for calendar_config in selected(&config, calendar.as_deref())? {
                let calendar = evaluate(calendar_config, now)?;
                out.insert(
                    calendar.name().to_string(),
                    json!({
                        "nextWake": calendar.next_wake(),
                        "actions": calendar.timeline(),
                    }),
                );
            }
            print_json(&Value::Object(out))?;
        }
        Commands::Status { calendar, now } => {
            let now = now.unwrap_or_else(Utc::now);
            let mut out = Map::new();
            for calendar_config in selected(&config, calendar.as_deref())? {
                let calendar = evaluate(calendar_config, now)?;
                out.insert(
                    calendar.name().to_string(),
                    serde_json::to_value(calendar.states())?,
                );
            }
            print_json(&Value::Object(out))?;
        }
        Commands::Run => run_daemon(config).await?,
    }

    Ok(())
}

fn selected<'a>(config: &'a Config, name: Option<&str>) -> Result<Vec<&'a CalendarConfig>> {
    let Some(name) = name else {
        return Ok(config.calendars.iter().collect());
    };
    match config.calendars.iter().find(|c| c.name == name) {
        Some(calendar) => Ok(vec![calendar]),
        None => bail!("no calendar named '{}'", name),
    }
}

/// Load one calendar at `now` without running its timer.
fn evaluate(config: &CalendarConfig, now: DateTime<Utc>) -> Result<Calendar> {
    let mut calendar = Calendar::from_config(config)
        .with_context(|| format!("invalid calendar '{}'", config.name))?;
    let mut sink = RecordingSink::new();
    calendar.init(&mut sink);

    let delivered = config.source().occurrences(&calendar.window(now));
    if let RefreshOutcome::Retained { error } = calendar.refresh(delivered, now, &mut sink) {
        bail!("calendar '{}' could not be loaded: {}", config.name, error);
    }
    Ok(calendar)
}

fn print_json(value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

async fn run_daemon(config: Config) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::with_capacity(config.calendars.len());
    for calendar_config in &config.calendars {
        let calendar = Calendar::from_config(calendar_config)
            .with_context(|| format!("invalid calendar '{}'", calendar_config.name))?;
        let task = CalendarTask {
            calendar,
            source: Arc::new(calendar_config.source()),
            polling_interval: calendar_config.polling_interval(),
            sink: LogSink::new(&calendar_config.name),
            clock: SystemClock,
        };
        handles.push(tokio::spawn(runtime::run(task, shutdown_rx.clone())));
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        calendars = handles.len(),
        "calsense running"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown requested");
    // Receivers may already be gone if every task ended.
    let _ = shutdown_tx.send(true);

    for handle in handles {
        let (calendar, _sink) = handle.await.context("calendar task panicked")?;
        info!(calendar = %calendar.name(), "calendar shut down");
    }
    Ok(())
}
