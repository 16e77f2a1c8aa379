//! Tracing subscriber and Prometheus exporter setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LogFormat};
use crate::error::Result;

/// Installs the global tracing subscriber.
///
/// An unparseable `RUST_LOG` directive falls back to `info`.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .try_init()?;
    Ok(())
}

/// Installs the Prometheus recorder and serves it on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn install_metrics(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
