// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! RSS to CSV Exporter Service
//!
//! Serves `GET /export?url=<feed>&sanitize=true` and answers with the
//! feed's items as a CSV attachment.
//!
//! ## Configuration
//!
//! All settings come from environment variables:
//!
//! - `PORT`: Listen address (default: :8080)
//! - `RSS_FETCH_TIMEOUT`: Upstream fetch timeout (default: 30s)
//! - `RATE_LIMIT_PER_MIN`: Requests per minute per client (default: 60)
//! - `DEFAULT_SANITIZE`: Strip HTML when `sanitize` is absent (default: false)
//! - `LOG_LEVEL`, `LOG_FORMAT`: Verbosity and `json`/`text` output
//!
//! `RUST_LOG`, when set, overrides `LOG_LEVEL`.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rss_csv_exporter::{
    config::{Config, LogFormat, LoggingConfig},
    handlers::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(&config.logging);

    info!(
        bind_addr = %config.bind_addr,
        requests_per_minute = config.rate_limit.requests_per_minute,
        fetch_timeout_ms = config.fetch.timeout_ms,
        max_feed_size = config.fetch.max_feed_size,
        default_sanitize = config.export.default_sanitize,
        "Starting RSS to CSV exporter"
    );

    let addr = config.socket_addr()?;
    let shutdown_timeout = config.server.shutdown_timeout();
    let state = Arc::new(AppState::new(config)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cleanup = state.limiter.clone().spawn_cleanup(shutdown_rx.clone());

    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    let mut server_shutdown = shutdown_rx;
    let mut server = tokio::spawn(
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .into_future(),
    );

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
        result = &mut server => {
            // The server only returns on its own after an I/O failure.
            cleanup.abort();
            result??;
            anyhow::bail!("server exited unexpectedly");
        }
    }

    // Stops both the accept loop and the limiter sweep.
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(result) => {
            result??;
            info!("Server stopped");
        }
        Err(_) => {
            warn!(
                timeout_ms = shutdown_timeout.as_millis() as u64,
                "Shutdown timed out, dropping in-flight requests"
            );
        }
    }
    if let Err(e) = cleanup.await {
        warn!(error = %e, "Rate limit cleanup task failed");
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(logging.level_filter().into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
