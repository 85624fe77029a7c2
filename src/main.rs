//! opmetrics demo entry point.
//!
//! Runs a small HTTP service instrumented with every piece of the library,
//! plus the scrape endpoint.
//!
//! ## CLI Subcommands
//!
//! - `opmetrics` or `opmetrics serve` - Run the demo service (default)
//! - `opmetrics config` - Print the effective configuration as JSON
//! - `opmetrics version` - Print the version

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use opmetrics::adapters::{BuildInfo, CacheMetricer, ServiceMetricer};
use opmetrics::config as op_config;
use opmetrics::exposition::MetricsServer;
use opmetrics::telemetry::init_logging;
use opmetrics::{PoolStats, PoolStatsSource, Telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "serve" | "" => match run_serve().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Server error: {}", e);
                ExitCode::FAILURE
            }
        },
        "config" => {
            let effective = op_config::load().effective_config();
            match serde_json::to_string_pretty(&effective) {
                Ok(text) => {
                    println!("{}", text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Failed to render configuration: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("opmetrics {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "opmetrics - operational telemetry demo v{}

USAGE:
    opmetrics [COMMAND]

COMMANDS:
    serve        Run the demo service and scrape endpoint (default)
    config       Print the effective configuration as JSON
    version      Show version information
    help         Show this help message

ENVIRONMENT:
    OPMETRICS_METRICS_ADDR            Scrape endpoint address (default: 0.0.0.0:9090)
    OPMETRICS_SERVICE_ADDR            Demo service address (default: 0.0.0.0:8080)
    OPMETRICS_SERVICE_NAME            Service name (default: opmetrics)
    OPMETRICS_ENV                     Environment (default: development)
    OPMETRICS_LOG_LEVEL               Log filter (default: info)
    OPMETRICS_LOG_FORMAT              json or pretty (default: json)
    OPMETRICS_SHUTDOWN_TIMEOUT        Graceful shutdown timeout in seconds (default: 5)
    OPMETRICS_POOL_STATS_INTERVAL_MS  Pool sampling interval (default: 15000)

EXIT CODES:
    0  Success
    1  Failure
",
        version
    );
}

/// In-memory connection pool standing in for a real database handle.
struct DemoPool {
    stats: Mutex<PoolStats>,
}

impl DemoPool {
    fn new(max_open: u64) -> Self {
        Self {
            stats: Mutex::new(PoolStats { max_open, ..PoolStats::default() }),
        }
    }

    fn checkout(&self) {
        let mut stats = self.stats.lock();
        if stats.idle > 0 {
            stats.idle -= 1;
        } else if stats.open < stats.max_open {
            stats.open += 1;
        } else {
            stats.wait_count += 1;
        }
        stats.in_use += 1;
    }

    fn checkin(&self) {
        let mut stats = self.stats.lock();
        stats.in_use = stats.in_use.saturating_sub(1);
        stats.idle += 1;
    }
}

impl PoolStatsSource for DemoPool {
    fn stats(&self) -> PoolStats {
        *self.stats.lock()
    }
}

#[derive(Clone)]
struct AppState {
    telemetry: Telemetry,
    pool: Arc<DemoPool>,
}

async fn info(State(state): State<AppState>, Path(id): Path<u64>) -> Json<serde_json::Value> {
    let mut request = state.telemetry.api_requests.begin(&id.to_string());
    let cache = state.telemetry.cache.cache("info");
    cache.inc_get(None);

    let mut query = state.telemetry.db.query("demo", "find_info");
    query.begin();
    state.pool.checkout();
    tokio::time::sleep(Duration::from_millis((id % 5) * 10)).await;
    state.pool.checkin();
    query.end(None);

    tracing::info!(method = "GET", handler = "/v1/info/:id", id, "served info");
    state.telemetry.api_requests.end(&mut request);
    Json(json!({ "id": id, "service": "opmetrics" }))
}

async fn ping() -> &'static str {
    "pong"
}

async fn run_serve() -> Result<(), Box<dyn std::error::Error>> {
    let config = op_config::load();
    let telemetry = Telemetry::new()?;
    init_logging(&config.log, Some(telemetry.logs.layer()))?;

    BuildInfo::from_env(&config.service_name, &config.environment)
        .with_revision(config.git_revision.clone())
        .with_branch(config.git_branch.clone())
        .register(&telemetry.registry)?;

    let daemon = telemetry.service.daemon(&config.service_name);
    daemon.service_starting();

    let pool = Arc::new(DemoPool::new(10));
    let source: Arc<dyn PoolStatsSource> = pool.clone();
    let sampler = telemetry
        .pool_stats
        .watch(Some(source), "demo", config.pool_stats_interval)?;

    let shutdown = CancellationToken::new();

    let metrics_server = MetricsServer::new(config.metrics_server.clone(), telemetry.registry.clone());
    let metrics_listener = metrics_server.bind().await?;
    let metrics_handle = tokio::spawn(metrics_server.serve(metrics_listener, shutdown.clone()));

    let state = AppState { telemetry: telemetry.clone(), pool };
    let app = telemetry.http.instrument(
        Router::new()
            .route("/v1/info/:id", get(info))
            .route("/v1/ping", get(ping))
            .with_state(state),
    );
    let listener = TcpListener::bind(config.service_addr.as_str()).await?;
    tracing::info!(address = %config.service_addr, "demo service listening");

    let service_shutdown = shutdown.clone();
    let service_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { service_shutdown.cancelled().await })
            .await
    });

    // Wait for Ctrl+C, then stop everything
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    shutdown.cancel();

    let drained = tokio::time::timeout(config.shutdown_timeout, async {
        sampler.stopped().await;
        if let Ok(Err(e)) = service_handle.await {
            tracing::error!(error = %e, "demo service error");
        }
        if let Ok(Err(e)) = metrics_handle.await {
            tracing::error!(error = %e, "metrics server error");
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(timeout_secs = config.shutdown_timeout.as_secs(), "shutdown timed out");
    }

    daemon.service_stopped();
    Ok(())
}
