//! Equipment Health - state-of-health reporting for monitored equipment
//!
//! Scores equipment over a time window from sensor samples, alarm counts and
//! status history, and persists the resulting health reports.
//!
//! # Usage
//!
//! ```bash
//! # Serve the HTTP API over a fixture
//! equipment-health serve --fixture plant.json
//!
//! # One-shot report for the last 24 hours of two pumps (aggregate)
//! equipment-health generate --fixture plant.json -e pump-1 -e pump-2
//!
//! # Generate a fixture, then report on it
//! simulate --scenario degrading --output plant.json
//! ```
//!
//! # Environment Variables
//!
//! - `EQUIPMENT_HEALTH_CONFIG`: Path to the engine TOML (default: ./health_config.toml)
//! - `EQUIPMENT_HEALTH_CORS_ORIGINS`: Comma-separated CORS origins for the API
//! - `RUST_LOG`: Logging level (default: info)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use equipment_health::api::{self, AppState};
use equipment_health::config::EngineConfig;
use equipment_health::sources::{Fixture, InMemoryAlarmStore, InMemoryRegistry, InMemoryTimeSeriesStore};
use equipment_health::storage;
use equipment_health::types::TimeWindow;
use equipment_health::{ReportAssembler, ReportRequest};

#[derive(Parser, Debug)]
#[command(name = "equipment-health")]
#[command(about = "Equipment state-of-health assessment engine")]
#[command(version)]
struct CliArgs {
    /// Engine config TOML (overrides the standard search order)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Fixture JSON used to populate the in-memory collaborators
        #[arg(short, long)]
        fixture: Option<PathBuf>,

        /// Bind address (overrides server.addr)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Generate and persist one report, printing it as JSON
    Generate {
        /// Fixture JSON used to populate the in-memory collaborators
        #[arg(short, long)]
        fixture: PathBuf,

        /// Equipment id (repeat for an aggregate report)
        #[arg(short, long = "equipment", required = true)]
        equipment: Vec<String>,

        /// Window length ending now, ignored when --start/--end are given
        #[arg(long, default_value = "24")]
        hours: i64,

        /// Window start (RFC 3339)
        #[arg(long, requires = "end")]
        start: Option<DateTime<Utc>>,

        /// Window end (RFC 3339)
        #[arg(long, requires = "start")]
        end: Option<DateTime<Utc>>,

        #[arg(long, default_value = "cli")]
        requested_by: String,

        /// Force an aggregate report even for one equipment
        #[arg(long)]
        aggregate: bool,
    },
    /// List persisted reports, newest first
    List {
        #[arg(short, long)]
        equipment: Option<String>,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Validate the engine config and print the effective TOML
    CheckConfig,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config from {}", p.display())),
        None => Ok(EngineConfig::load()),
    }
}

/// Build an assembler over fixture-backed (or empty) in-memory collaborators.
fn build_assembler(config: &EngineConfig, fixture: Option<&Path>) -> Result<ReportAssembler> {
    let (registry, series, alarms) = match fixture {
        Some(path) => {
            let stores = Fixture::load(path)
                .and_then(Fixture::into_stores)
                .with_context(|| format!("Failed to load fixture {}", path.display()))?;
            (stores.registry, stores.series, stores.alarms)
        }
        None => {
            warn!("No fixture given; collaborators start empty");
            (
                Arc::new(InMemoryRegistry::new()),
                Arc::new(InMemoryTimeSeriesStore::new()),
                Arc::new(InMemoryAlarmStore::new()),
            )
        }
    };
    let repository = storage::open_repository(&config.storage)
        .with_context(|| format!("Failed to open report store at {}", config.storage.path))?;
    Ok(ReportAssembler::from_config(config, series, alarms, registry, repository))
}

async fn serve(config: &EngineConfig, fixture: Option<&Path>, addr: Option<String>) -> Result<()> {
    let assembler = build_assembler(config, fixture)?;
    let app = api::create_app(AppState::new(assembler));
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "[HttpServer] Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("[HttpServer] Received shutdown signal");
        })
        .await
        .context("HTTP server failed")?;

    info!("[HttpServer] Graceful shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.json_logs);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Serve { fixture, addr } => serve(&config, fixture.as_deref(), addr).await?,
        Command::Generate {
            fixture,
            equipment,
            hours,
            start,
            end,
            requested_by,
            aggregate,
        } => {
            let window = match (start, end) {
                (Some(start), Some(end)) => TimeWindow::new(start, end),
                _ => {
                    if hours <= 0 {
                        bail!("--hours must be positive");
                    }
                    TimeWindow::last_hours(hours)
                }
            };
            let assembler = build_assembler(&config, Some(&fixture))?;
            let mut request = ReportRequest::new(equipment, window).requested_by(requested_by);
            request.aggregate = aggregate;
            let report = assembler.generate_report(request).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::List { equipment, limit } => {
            let repository = storage::open_repository(&config.storage)
                .with_context(|| format!("Failed to open report store at {}", config.storage.path))?;
            let reports = repository.list(equipment.as_deref(), limit)?;
            if reports.is_empty() {
                println!("No reports found");
            }
            for r in reports {
                println!(
                    "{}  {}  {:<24} score={:>5.1} level={:<9} risk={:<6} conf={:.2}",
                    r.generated_at.format("%Y-%m-%d %H:%M:%S"),
                    r.id,
                    r.equipment_ids.join(","),
                    r.score,
                    r.level,
                    r.risk_level,
                    r.confidence,
                );
            }
        }
        Command::CheckConfig => {
            config.validate()?;
            println!("{}", config.to_toml()?);
            info!("Config is valid");
        }
    }

    Ok(())
}
