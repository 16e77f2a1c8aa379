//! Application configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use saga::RetryWithExponentialBackoff;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Process configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `METRICS_ADDR`: Prometheus scrape address (default: `0.0.0.0:9000`)
/// - `RECONCILE_INITIAL_INTERVAL_MS`: first convergence poll delay (default: `200`)
/// - `RECONCILE_MULTIPLIER`: delay growth factor (default: `2.0`)
/// - `RECONCILE_MAX_WAIT_MS`: convergence window (default: `60000`)
/// - `SNAPSHOT_INTERVAL`: events between aggregate snapshots (default: `100`)
///
/// Unparseable values fall back to the default. So do zero intervals and
/// non-finite multipliers.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
    pub log_format: LogFormat,
    pub metrics_addr: SocketAddr,
    pub reconcile_initial_interval: Duration,
    pub reconcile_multiplier: f32,
    pub reconcile_max_wait: Duration,
    pub snapshot_interval: usize,
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_filter: std::env::var("RUST_LOG").unwrap_or(defaults.log_filter),
            log_format: std::env::var("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            metrics_addr: parsed("METRICS_ADDR").unwrap_or(defaults.metrics_addr),
            reconcile_initial_interval: parsed("RECONCILE_INITIAL_INTERVAL_MS")
                .filter(|&ms: &u64| ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconcile_initial_interval),
            reconcile_multiplier: parsed("RECONCILE_MULTIPLIER")
                .filter(|m: &f32| m.is_finite())
                .unwrap_or(defaults.reconcile_multiplier),
            reconcile_max_wait: parsed("RECONCILE_MAX_WAIT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconcile_max_wait),
            snapshot_interval: parsed("SNAPSHOT_INTERVAL")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.snapshot_interval),
        }
    }

    /// The convergence waiter the saga polls with.
    pub fn waiter(&self) -> RetryWithExponentialBackoff {
        RetryWithExponentialBackoff::new(
            self.reconcile_initial_interval,
            self.reconcile_multiplier,
            self.reconcile_max_wait,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            reconcile_initial_interval: Duration::from_millis(200),
            reconcile_multiplier: 2.0,
            reconcile_max_wait: Duration::from_secs(60),
            snapshot_interval: 100,
        }
    }
}
