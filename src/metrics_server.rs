//! Metrics HTTP server
//!
//! Exposes the exporter's registry to Prometheus.
//!
//! ## Endpoints
//!
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /health` - Health check with registry occupancy
//!
//! ## Scraping with Prometheus
//!
//! Add to your `prometheus.yml`:
//! ```yaml
//! scrape_configs:
//!   - job_name: 'memgraph'
//!     static_configs:
//!       - targets: ['localhost:9115']
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;

use crate::registry::MetricRegistry;

#[cfg(feature = "metrics-server")]
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
#[cfg(feature = "metrics-server")]
use tower_http::trace::TraceLayer;
#[cfg(feature = "metrics-server")]
use tracing::info;

/// Errors raised while running the metrics server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen socket could not be bound, or serving failed.
    #[error("metrics server on {addr}: {source}")]
    Io {
        /// Listen address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The crate was built without the `metrics-server` feature.
    #[error("metrics server requires the 'metrics-server' feature")]
    Disabled,
}

#[cfg(feature = "metrics-server")]
/// Build the router serving `registry`.
pub fn router(registry: Arc<MetricRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

#[cfg(feature = "metrics-server")]
/// Serve `registry` on `addr` until `shutdown` becomes `true` or its sender
/// is dropped.
///
/// ## Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use memgraph_exporter::{catalog::Catalog, registry::MetricRegistry};
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = Arc::new(MetricRegistry::new(&Catalog::standalone()?)?);
///     let (tx, rx) = tokio::sync::watch::channel(false);
///     let handle = tokio::spawn(memgraph_exporter::metrics_server::start_server(
///         "0.0.0.0:9115".parse()?,
///         registry,
///         rx,
///     ));
///
///     // Exporter runs here...
///
///     tx.send(true)?;
///     handle.await??;
///     Ok(())
/// }
/// ```
pub async fn start_server(
    addr: SocketAddr,
    registry: Arc<MetricRegistry>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    info!("Starting metrics server on http://{}", addr);

    let app = router(registry);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Io { addr, source })?;

    info!("Metrics server ready at http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .map_err(|source| ServerError::Io { addr, source })?;

    info!("Metrics server stopped");
    Ok(())
}

#[cfg(feature = "metrics-server")]
/// Handler for /metrics endpoint
async fn metrics_handler(State(registry): State<Arc<MetricRegistry>>) -> Response {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        registry.gather_metrics(),
    )
        .into_response()
}

#[cfg(feature = "metrics-server")]
/// Handler for /health endpoint
async fn health_handler(State(registry): State<Arc<MetricRegistry>>) -> Response {
    let summary = registry.summary();

    let health_status = serde_json::json!({
        "status": "healthy",
        "topology": summary.topology.to_string(),
        "registered_metrics": summary.registered_metrics,
        "labeled_series": summary.labeled_series,
        "instances": summary.instances,
    });

    (
        StatusCode::OK,
        [("Content-Type", "application/json")],
        serde_json::to_string_pretty(&health_status)
            .unwrap_or_else(|_| r#"{"error":"serialization failed"}"#.to_string()),
    )
        .into_response()
}

#[cfg(not(feature = "metrics-server"))]
/// Metrics server is not available without the `metrics-server` feature
pub async fn start_server(
    _addr: SocketAddr,
    _registry: Arc<MetricRegistry>,
    _shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    Err(ServerError::Disabled)
}
