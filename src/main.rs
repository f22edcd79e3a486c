//! HydraWatch - pipeline hydrate-risk monitor
//!
//! Polls the sensor backend for the active operating mode, classifies each
//! reading against the mode's thresholds, raises alerts on escalation and
//! serves the results over a small JSON API.
//!
//! # Usage
//!
//! ```bash
//! # Against a running sensor backend
//! HYDRAWATCH_API_TOKEN=... hydrawatch --backend http://localhost:8000/api/v1
//!
//! # Self-contained demo with an in-memory backend and generated readings
//! hydrawatch --demo --seed 7
//!
//! # Show the effective configuration
//! hydrawatch --config hydrawatch.toml --print-config
//! ```
//!
//! # Environment Variables
//!
//! - `HYDRAWATCH_CONFIG`: Path to the TOML config file
//! - `HYDRAWATCH_API_TOKEN`: Bearer token for the sensor backend
//! - `HYDRAWATCH_SERVER_ADDR`: Status API bind address
//! - `HYDRAWATCH_CORS_ORIGINS`: Comma-separated allowed origins
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use hydrawatch::acquisition::{HttpSensorApi, InMemorySensorApi, ReadingGenerator, SensorApi};
use hydrawatch::api::{create_app, ApiState};
use hydrawatch::config::MonitorConfig;
use hydrawatch::pipeline::Monitor;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "hydrawatch")]
#[command(about = "Pipeline hydrate-risk monitor")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides HYDRAWATCH_CONFIG and ./hydrawatch.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the status API bind address (default: "0.0.0.0:8090")
    #[arg(short, long)]
    addr: Option<String>,

    /// Override the sensor backend base URL
    #[arg(long, value_name = "URL")]
    backend: Option<String>,

    /// Run against an in-memory backend fed with generated readings
    #[arg(long)]
    demo: bool,

    /// Seed for the demo reading generator
    #[arg(long, env = "HYDRAWATCH_DEMO_SEED", default_value_t = 42)]
    seed: u64,

    /// Operating mode at startup (offshore | onshore)
    #[arg(long)]
    mode: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    Polling,
    DemoFeeder,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpServer => write!(f, "HttpServer"),
            Self::Polling => write!(f, "Polling"),
            Self::DemoFeeder => write!(f, "DemoFeeder"),
        }
    }
}

// ============================================================================
// Startup
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Load the config file, layer CLI overrides on top, then validate once.
fn load_config(args: &CliArgs) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = MonitorConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_overrides();
            info!(path = %path.display(), "Loaded monitor config from --config");
            config
        }
        None => MonitorConfig::locate().context("Failed to load monitor config")?,
    };

    if let Some(addr) = &args.addr {
        config.server.addr.clone_from(addr);
    }
    if let Some(url) = &args.backend {
        config.backend.base_url.clone_from(url);
    }
    if let Some(mode) = &args.mode {
        config.monitor.initial_mode = mode.parse().context("Invalid --mode")?;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// The backend the monitor polls, plus the in-memory store to feed in demo mode.
type Backend = (Arc<dyn SensorApi>, Option<Arc<InMemorySensorApi>>);

async fn build_backend(args: &CliArgs, config: &MonitorConfig) -> Result<Backend> {
    if args.demo {
        let api = Arc::new(InMemorySensorApi::with_sample_data().await);
        info!(seed = args.seed, "Backend: in-memory demo with sample data");
        let shared: Arc<dyn SensorApi> = api.clone();
        Ok((shared, Some(api)))
    } else {
        let api = HttpSensorApi::new(&config.backend).context("Failed to build sensor backend client")?;
        info!(url = %api.base_url(), "Backend: REST");
        let shared: Arc<dyn SensorApi> = Arc::new(api);
        Ok((shared, None))
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Insert a generated reading for the active mode every polling interval.
fn spawn_demo_feeder(
    task_set: &mut JoinSet<Result<TaskName>>,
    backend: Arc<InMemorySensorApi>,
    monitor: Monitor,
    seed: u64,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[DemoFeeder] Task starting");
        let mut generator = ReadingGenerator::new(seed);
        let mut ticker = tokio::time::interval(monitor.polling().interval());
        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    let mode = monitor.mode().await;
                    let stored = backend.insert(generator.next_reading(mode)).await;
                    debug!(mode = %mode, id = ?stored.id, risk = ?stored.hydrate_risk, "[DemoFeeder] Reading generated");
                }
            }
        }
        info!("[DemoFeeder] Stopped");
        Ok(TaskName::DemoFeeder)
    });
}

async fn run_supervisor(task_set: &mut JoinSet<Result<TaskName>>, cancel_token: CancellationToken) -> Result<()> {
    info!("Supervisor: All tasks spawned, monitoring...");

    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(Ok(task_name)) => {
                info!("Supervisor: Task {} completed", task_name);
                cancel_token.cancel();
            }
            Ok(Err(e)) => {
                error!("Supervisor: Task failed with error: {}", e);
                cancel_token.cancel();
                return Err(e);
            }
            Err(e) => {
                error!("Supervisor: Task panicked: {}", e);
                cancel_token.cancel();
                return Err(anyhow::anyhow!("Task panicked: {}", e));
            }
        }
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = load_config(&args)?;
    if args.print_config {
        print!("{}", config.to_toml_string().context("Failed to serialize config")?);
        return Ok(());
    }

    info!("HydraWatch - pipeline hydrate-risk monitor");
    let (api, demo_backend) = build_backend(&args, &config).await?;
    let monitor = Monitor::new(&config, api).context("Failed to initialize monitor")?;

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("Status API listening on http://{}", config.server.addr);
    let app = create_app(ApiState::new(monitor.clone()));

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    let polling_monitor = monitor.clone();
    let polling_cancel = cancel_token.clone();
    task_set.spawn(async move {
        polling_monitor.run(polling_cancel).await;
        Ok(TaskName::Polling)
    });

    if let Some(backend) = demo_backend {
        spawn_demo_feeder(&mut task_set, backend, monitor.clone(), args.seed, cancel_token.clone());
    }

    info!(mode = %monitor.mode().await, "Monitoring started");

    run_supervisor(&mut task_set, cancel_token).await?;
    info!("HydraWatch shutdown complete");
    Ok(())
}
