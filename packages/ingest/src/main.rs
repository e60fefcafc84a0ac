#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the active-incident poller.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::{Parser, Subcommand};
use incident_watch_analytics::report::{build_report, generate_weekly_report};
use incident_watch_analytics_models::TimeWindow;
use incident_watch_database::{incidents, meta, migrate, reports};
use incident_watch_ingest::config::Config;
use incident_watch_ingest::cycle::{log_outcome, poll_cycle, watch};
use incident_watch_ingest::publish::PublishTarget;
use incident_watch_ingest::{
    build_feed, build_publisher, cycle_settings, open_store, report_options,
};
use incident_watch_render::format::local_date;
use incident_watch_render::report::{render_incident_list, render_report};

/// Console listings are not bound by the message budget.
const UNBOUNDED: usize = usize::MAX;

#[derive(Parser)]
#[command(
    name = "incident_watch",
    about = "Active incident feed tracker and reporter"
)]
struct Cli {
    /// TOML config file (defaults to the embedded configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single poll cycle and publish any changes
    Poll,
    /// Poll on an interval until interrupted
    Watch {
        /// Seconds between polls (overrides `feed.poll_interval_secs`)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Generate, archive and publish the weekly report
    Report {
        /// Print the report instead of publishing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print aggregate statistics over a trailing window
    Stats {
        /// Window length in hours
        #[arg(long, default_value = "24")]
        hours: u32,
    },
    /// List incidents that have not cleared
    Active,
    /// List incidents received within a trailing window
    Recent {
        /// Window length in hours
        #[arg(long, default_value = "24")]
        hours: u32,
        /// Maximum number of incidents to list
        #[arg(long, default_value = "50")]
        limit: u32,
    },
    /// Fill derived columns left empty by older versions
    Backfill,
    /// List archived reports, most recent first
    Reports {
        /// Maximum number of reports to list
        #[arg(long, default_value = "10")]
        limit: u32,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let tz = config.tz()?;
    let conn = open_store(&config)?;

    match cli.command {
        Commands::Poll => {
            let feed = build_feed(&config)?;
            let publisher = build_publisher(&config);
            let settings = cycle_settings(&config)?;

            let previous = meta::load_snapshot(&conn)?;
            let (_, outcome) = poll_cycle(
                &conn,
                &feed,
                publisher.as_ref(),
                &settings,
                &previous,
                Utc::now(),
            )
            .await?;
            log_outcome(&outcome);
        }
        Commands::Watch { interval } => {
            let feed = build_feed(&config)?;
            let publisher = build_publisher(&config);
            let settings = cycle_settings(&config)?;
            let interval =
                interval.map_or_else(|| config.feed.poll_interval(), Duration::from_secs);

            if interval.is_zero() {
                return Err("--interval must be positive".into());
            }

            watch(&conn, &feed, publisher.as_ref(), &settings, interval).await?;
        }
        Commands::Report { dry_run } => {
            let start = Instant::now();
            let options = report_options(&config);
            let record =
                generate_weekly_report(&conn, &config.classifier, &tz, Utc::now(), &options)?;

            if dry_run {
                println!("{}", record.text);
            } else {
                let publisher = build_publisher(&config);
                publisher
                    .publish(&record.text, &PublishTarget::default())
                    .await?;
                log::info!("Published report to {}", publisher.label());
            }

            log::info!(
                "Report for {} complete in {:.1}s",
                local_date(record.period_start, &tz),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Stats { hours } => {
            let window = TimeWindow::trailing_hours(hours, Utc::now());
            let report = build_report(&conn, &config.classifier, &window, config.report.top_n)?;
            let rendered = render_report(&format!("Last {hours}h"), &report, &tz, UNBOUNDED);
            println!("{}", rendered.text);
        }
        Commands::Active => {
            let active = incidents::query_active(&conn)?;
            let rendered = render_incident_list("Active incidents", &active, &tz, UNBOUNDED);
            println!("{}", rendered.text);
        }
        Commands::Recent { hours, limit } => {
            let recent = incidents::query_recent(&conn, hours, limit, Utc::now())?;
            let total = incidents::total_count(&conn)?;
            let rendered = render_incident_list(
                &format!("Received in the last {hours}h"),
                &recent,
                &tz,
                UNBOUNDED,
            );
            println!("{}", rendered.text);
            log::info!("{total} occurrences stored in total");
        }
        Commands::Backfill => {
            let start = Instant::now();
            let filled = migrate::backfill_derived_columns(&conn, &tz)?;
            log::info!(
                "Backfill complete: {filled} rows updated in {:.1}s",
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Reports { limit } => {
            let archived = reports::latest_reports(&conn, limit)?;
            if archived.is_empty() {
                println!("No archived reports");
                return Ok(());
            }
            println!(
                "{:<12} {:>7} {:>8} {:>8} {:>6}",
                "PERIOD", "TOTAL", "VIOLENT", "CLEARED", "NOISE"
            );
            println!("{}", "-".repeat(45));
            for record in &archived {
                println!(
                    "{:<12} {:>7} {:>8} {:>8} {:>6}",
                    local_date(record.period_start, &tz),
                    record.total,
                    record.violent,
                    record.cleared,
                    record.noise
                );
            }
        }
    }

    Ok(())
}
