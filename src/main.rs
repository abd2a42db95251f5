//! Intelligence Unit - Entry Point
//!
//! Initializes configuration, logging and the report store, then serves
//! the HTTP API until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml (optional) + env overrides + validate
//! 2. Init tracing (JSON structured logging) and the exit-on-panic hook
//! 3. Connect the report store (MongoDB with bounded retry, or in-memory)
//! 4. Build metrics registry, shared state and router
//! 5. Serve until SIGINT/SIGTERM, draining in-flight requests
//! 6. Close the store connection

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use intel_unit::adapters::http::{self, AppState};
use intel_unit::adapters::metrics::MetricsRegistry;
use intel_unit::adapters::panic_hook;
use intel_unit::adapters::persistence::{
    InMemoryReportStore, MongoReportStore, MongoSettings, RetryPolicy,
};
use intel_unit::config::{self, AppConfig, StoreBackend};
use intel_unit::ports::ReportStore;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config = config::loader::load_from_env().context("Failed to load configuration")?;

    // ── 2. Initialize structured logging ────────────────────
    init_tracing(&config);
    panic_hook::install_panic_hook();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.server.environment,
        backend = ?config.database.backend,
        "Starting Intelligence Unit API"
    );

    // ── 3. Connect the report store ─────────────────────────
    let mongo = match config.database.backend {
        StoreBackend::Mongodb => Some(connect_mongo(&config).await?),
        StoreBackend::Memory => None,
    };
    let store: Arc<dyn ReportStore> = match &mongo {
        Some(mongo) => Arc::new(mongo.clone()),
        None => {
            info!("Using in-memory report store; data is lost on exit");
            Arc::new(InMemoryReportStore::new())
        }
    };

    // ── 4. Build state and router ───────────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let state = AppState::new(store, &config, metrics);
    let limiters = Arc::clone(&state.limiters);
    let app = http::create_router(state);

    // ── 5. Serve until shutdown signal ──────────────────────
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.server.host, config.server.port))?;
    http::server::serve(app, addr, limiters)
        .await
        .context("HTTP server failed")?;

    // ── 6. Close the store connection ───────────────────────
    if let Some(mongo) = mongo {
        mongo.close().await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Connect with bounded retry and ensure indexes.
///
/// A `StartupError` propagates out of `main`, exiting non-zero.
async fn connect_mongo(config: &AppConfig) -> Result<MongoReportStore> {
    let settings = mongo_settings(config);
    let policy = retry_policy(config);
    let mongo = MongoReportStore::connect_with_retry(&settings, &policy)
        .await
        .inspect_err(|e| error!(error = %e, "Report store unreachable, aborting startup"))?;
    mongo
        .ensure_indexes()
        .await
        .context("Failed to create report indexes")?;
    Ok(mongo)
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn mongo_settings(config: &AppConfig) -> MongoSettings {
    let db = &config.database;
    MongoSettings {
        uri: db.connection_string.clone(),
        database: db.name.clone(),
        collection: db.collection.clone(),
        min_pool_size: db.min_pool_size,
        max_pool_size: db.max_pool_size,
        max_idle_time: Duration::from_secs(db.max_idle_seconds),
        server_selection_timeout: Duration::from_millis(db.server_selection_timeout_ms),
        app_name: "intel-unit".to_string(),
    }
}

fn retry_policy(config: &AppConfig) -> RetryPolicy {
    let retry = &config.database.connect_retry;
    RetryPolicy {
        max_attempts: retry.max_attempts,
        initial_delay: Duration::from_millis(retry.initial_delay_ms),
        multiplier: retry.multiplier,
        max_delay: Duration::from_millis(retry.max_delay_ms),
    }
}
