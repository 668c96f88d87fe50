//! Portfolio Risk Engine Binary
//!
//! Starts the periodic risk aggregation loop.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin portfolio-risk-engine
//! ```
//!
//! # Environment Variables
//!
//! ## Position sources
//! - `BINANCE_POSITIONS_FILE`: JSON positions for Binance (unset: synthetic)
//! - `BYBIT_POSITIONS_FILE`: JSON positions for Bybit (unset: synthetic)
//! - `FORCE_SYNTHETIC_MODE`: Ignore live sources (default: false)
//! - `SYNTHETIC_SEED`: Synthetic generator seed (default: 42)
//!
//! ## Optional
//! - `REFRESH_INTERVAL_SECS`: Live tick interval (default: 10)
//! - `SYNTHETIC_REFRESH_INTERVAL_SECS`: Degraded tick interval (default: 5)
//! - `RISK_ENGINE_METRICS_PORT`: Prometheus metrics port, 0 disables (default: 9091)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `RUST_LOG`: Log filter (default: portfolio_risk_engine=info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use portfolio_risk_engine::application::ports::{
    Clock, EngineMetrics, PositionSource, SystemClock,
};
use portfolio_risk_engine::application::services::{
    SnapshotPublisher, SourceRegistry, UpdateScheduler,
};
use portfolio_risk_engine::domain::greeks::GreeksEngine;
use portfolio_risk_engine::domain::portfolio::PortfolioAggregator;
use portfolio_risk_engine::domain::position::Exchange;
use portfolio_risk_engine::infrastructure::broadcast::SnapshotBroadcastHub;
use portfolio_risk_engine::infrastructure::metrics::{PrometheusMetrics, init_metrics};
use portfolio_risk_engine::infrastructure::sources::{
    JsonFilePositionSource, SyntheticPositionSource,
};
use portfolio_risk_engine::infrastructure::subscribers::LoggingSubscriber;
use portfolio_risk_engine::infrastructure::telemetry;
use portfolio_risk_engine::EngineConfig;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (tracing + optional OpenTelemetry)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Portfolio Risk Engine");

    let config = EngineConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    init_metrics(config.server.metrics_port).context("failed to start metrics exporter")?;

    let shutdown_token = CancellationToken::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let metrics: Arc<dyn EngineMetrics> = Arc::new(PrometheusMetrics);

    // Position sources: a JSON file per configured exchange, synthetic otherwise
    let synthetic = Arc::new(SyntheticPositionSource::new(
        config.sources.synthetic_seed,
        Arc::clone(&clock),
    ));
    let files = JsonFilePositionSource::new(config.sources.position_files.clone());
    let configured: Vec<Exchange> = Exchange::ALL
        .into_iter()
        .filter(|exchange| files.is_configured(*exchange))
        .collect();
    let files: Arc<dyn PositionSource> = Arc::new(files);
    let mut registry = SourceRegistry::new(synthetic);
    for exchange in configured {
        registry = registry.with_live(exchange, Arc::clone(&files));
    }

    // Publisher with operator log and transport broadcast
    let publisher = Arc::new(
        SnapshotPublisher::new(config.scheduler.subscriber_timeout)
            .with_metrics(Arc::clone(&metrics)),
    );
    let broadcast_hub = Arc::new(SnapshotBroadcastHub::new(config.server.broadcast_capacity));
    publisher.subscribe(Arc::new(LoggingSubscriber::new()));
    publisher.subscribe(broadcast_hub);

    let scheduler = UpdateScheduler::new(
        config.scheduler_config(),
        registry,
        GreeksEngine::new(config.pricing),
        PortfolioAggregator::new(config.thresholds, config.activity_capacity),
        publisher,
        clock,
    )
    .with_metrics(metrics);
    let handle = scheduler.spawn(shutdown_token.clone());

    tracing::info!("Risk engine ready");

    await_shutdown(shutdown_token).await;

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.shutdown()).await {
        Ok(Ok(())) => tracing::info!("Risk engine stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Scheduler task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Scheduler did not stop in time"
        ),
    }

    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &EngineConfig) {
    tracing::info!(
        refresh_interval_secs = config.scheduler.refresh_interval.as_secs(),
        synthetic_refresh_interval_secs = config.scheduler.synthetic_refresh_interval.as_secs(),
        force_synthetic = config.scheduler.force_synthetic,
        metrics_port = config.server.metrics_port,
        "Configuration loaded"
    );
    for (exchange, path) in config.sources.position_files.iter() {
        match path {
            Some(path) => tracing::info!(exchange = %exchange, file = %path.display(), "Live position file"),
            None => tracing::info!(exchange = %exchange, "No live source, using synthetic positions"),
        }
    }
    tracing::debug!(
        default_volatility = %config.pricing.default_volatility,
        risk_free_rate = %config.pricing.default_risk_free_rate,
        activity_capacity = config.activity_capacity,
        "Pricing defaults"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
