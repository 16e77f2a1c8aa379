//! Process entry point.

use std::sync::Arc;

use crypto::InMemoryKeyStore;
use event_store::InMemoryEventStore;
use runtime::{App, Config, RuntimeError, telemetry};
use saga::InMemoryIdentityProvider;
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, shutting down");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), RuntimeError> {
    let config = Config::from_env();

    // 1. Observability
    telemetry::init_tracing(&config)?;
    telemetry::install_metrics(config.metrics_addr)?;
    tracing::info!(?config, "configuration loaded");

    // 2. Stores, identity provider and wiring
    let app = App::new(
        InMemoryEventStore::new(),
        Arc::new(InMemoryKeyStore::new()),
        Arc::new(InMemoryIdentityProvider::new()),
        &config,
    )?;

    // 3. Catch up the views and follow the log
    let workers = app.start().await?;
    tracing::info!("running");

    shutdown_signal().await;
    workers.shutdown();
    Ok(())
}
