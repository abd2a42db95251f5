//! HTTP server startup and graceful shutdown.
//!
//! The server handles SIGINT/SIGTERM gracefully:
//! - Stops accepting new connections
//! - Waits for in-flight requests to drain
//! - Returns so `main` can close the store connection

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tracing::{error, info};

use super::RateLimiters;

/// How often idle rate-limit buckets are swept.
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Bind `addr` and serve `app` until a shutdown signal arrives.
///
/// # Errors
/// Returns `std::io::Error` if the port is already in use or the
/// network interface is unavailable.
pub async fn serve(
    app: Router,
    addr: SocketAddr,
    limiters: Arc<RateLimiters>,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;
    info!(address = %actual_addr, "HTTP server listening");

    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            limiters.retain_recent();
        }
    });

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.abort();
    info!("HTTP server stopped gracefully");
    result
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("SIGINT received, initiating graceful shutdown");
        }
        () = terminate => {
            info!("SIGTERM received, initiating graceful shutdown");
        }
    }
}
