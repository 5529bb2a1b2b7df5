//! # memgraph-exporter
//!
//! Prometheus exporter for Memgraph, standalone or high-availability.
//!
//! ## Architecture
//!
//! ```text
//! config ─► StatsPoller ──HTTP──► instance stats (JSON)
//!                │
//!                ▼
//!          UpdateEngine ──► MetricRegistry ◄── metrics_server (/metrics, /health)
//! ```
//!
//! The [`catalog::Catalog`] fixes the set of exported metrics per topology.
//! The [`registry::MetricRegistry`] holds their live values and is shared by
//! the poller (writer) and the HTTP server (reader).

// ── Lint policy ───────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(missing_docs)]

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub mod catalog;
pub mod config;
pub mod engine;
pub mod instance;
pub mod metrics_server;
pub mod poller;
pub mod registry;

// Re-exports for convenience
pub use catalog::{Catalog, Category, MetricGroup, Topology};
pub use config::ExporterConfig;
pub use engine::{StatsPayload, UpdateEngine, UpdateReport};
pub use instance::{Instance, InstanceRole};
pub use poller::{PollerConfig, StatsPoller};
pub use registry::MetricRegistry;

/// Initialise the global tracing subscriber.
///
/// Reads the `LOG_FORMAT` environment variable to choose output format:
/// - `"json"`: structured JSON output for log aggregators
/// - anything else (including unset): human-readable pretty output
///
/// Filter level is controlled by `RUST_LOG` and defaults to `info`.
///
/// # Errors
///
/// Returns [`ExporterError::Tracing`] if the global subscriber has already
/// been set (e.g. by a previous call or a test harness).
///
/// # Example
///
/// ```no_run
/// # use memgraph_exporter::{init_tracing, ExporterError};
/// # fn example() -> Result<(), ExporterError> {
/// init_tracing()?;
/// # Ok(()) }
/// ```
pub fn init_tracing() -> Result<(), ExporterError> {
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .try_init(),
        _ => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .try_init(),
    };

    result.map_err(|e| ExporterError::Tracing(e.to_string()))
}

/// Top-level exporter errors.
///
/// Every module error converts into a variant here, so the binary can use
/// `?` across layers.
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Configuration could not be read, parsed, or validated.
    #[error("configuration error: {0}")]
    Config(#[from] config::validation::ConfigError),

    /// The metric catalog is inconsistent.
    #[error("catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    /// Registering or writing a metric failed.
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),

    /// Routing a payload failed.
    #[error("update error: {0}")]
    Route(#[from] engine::RouteError),

    /// Fetching instance statistics failed.
    #[error("fetch error: {0}")]
    Fetch(#[from] poller::FetchError),

    /// The metrics server failed.
    #[error("server error: {0}")]
    Server(#[from] metrics_server::ServerError),

    /// The tracing subscriber could not be installed.
    #[error("tracing init failed: {0}")]
    Tracing(String),
}

/// Build the catalog and registry for `topology`.
///
/// # Errors
///
/// Returns [`ExporterError::Catalog`] or [`ExporterError::Registry`] if the
/// catalog cannot be turned into collectors.
pub fn build_registry(topology: Topology) -> Result<std::sync::Arc<MetricRegistry>, ExporterError> {
    let catalog = Catalog::for_topology(topology)?;
    Ok(std::sync::Arc::new(MetricRegistry::new(&catalog)?))
}
