//! # Stats Poller
//!
//! ## Responsibility
//!
//! Fetches the JSON statistics of every configured instance once per tick
//! and hands each decoded payload to the [`UpdateEngine`].
//!
//! ## Guarantees
//!
//! - **Sequential**: instances are polled one after another, in
//!   configuration order, on a single task.
//! - **Non-panicking**: a failed fetch is logged with `warn!` and the instance
//!   is skipped until the next tick. There is no backoff.
//! - **Stoppable**: [`StatsPoller::run`] returns as soon as the shutdown
//!   channel flips, without starting another round.
//!
//! ## NOT Responsible For
//!
//! - Deciding where payload values land (that belongs to `engine`).
//! - Serving the registry (that belongs to `metrics_server`).

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::catalog::Topology;
use crate::engine::{StatsPayload, UpdateEngine, UpdateReport};
use crate::instance::Instance;

/// Errors raised while fetching one instance's statistics.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection failure, timeout, or body read error.
    #[error("request to {url} failed: {source}")]
    Request {
        /// Polled URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("{url} answered HTTP {status}")]
    Status {
        /// Polled URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The body was not a JSON object.
    #[error("invalid stats payload from {url}: {source}")]
    Decode {
        /// Polled URL.
        url: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Timing knobs of the [`StatsPoller`].
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between two polling rounds.
    pub poll_interval: Duration,
    /// TCP connection timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Polls instances and feeds their statistics into the registry.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use memgraph_exporter::catalog::Catalog;
/// use memgraph_exporter::engine::UpdateEngine;
/// use memgraph_exporter::instance::{Instance, InstanceRole};
/// use memgraph_exporter::poller::{PollerConfig, StatsPoller};
/// use memgraph_exporter::registry::MetricRegistry;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = Arc::new(MetricRegistry::new(&Catalog::standalone()?)?);
///     let instance = Instance::new("memgraph", "http://localhost", 9091, InstanceRole::DataInstance);
///     let poller = StatsPoller::new(PollerConfig::default(), vec![instance], UpdateEngine::new(registry));
///     let (_tx, rx) = tokio::sync::watch::channel(false);
///     poller.run(rx).await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct StatsPoller {
    config: PollerConfig,
    instances: Vec<Instance>,
    engine: UpdateEngine,
    client: reqwest::Client,
}

impl StatsPoller {
    /// Create a poller over `instances`. The topology is taken from the
    /// engine's registry.
    pub fn new(config: PollerConfig, instances: Vec<Instance>, engine: UpdateEngine) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();

        Self {
            config,
            instances,
            engine,
            client,
        }
    }

    /// Instances polled on every tick.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Fetch and decode the statistics of one instance.
    ///
    /// # Errors
    ///
    /// See [`FetchError`].
    pub async fn fetch(&self, instance: &Instance) -> Result<StatsPayload, FetchError> {
        let url = instance.stats_url();

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url,
                status: resp.status().as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })?;
        StatsPayload::from_slice(&body).map_err(|source| FetchError::Decode { url, source })
    }

    /// Run one polling round over every instance.
    ///
    /// Returns the update report of each instance that answered, paired with
    /// its name.
    pub async fn poll_once(&self) -> Vec<(String, UpdateReport)> {
        let topology = self.engine.registry().topology();
        let mut reports = Vec::with_capacity(self.instances.len());

        for instance in &self.instances {
            let payload = match self.fetch(instance).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        instance = instance.name(),
                        error = %e,
                        "Failed to fetch stats, skipping until next tick"
                    );
                    continue;
                }
            };

            let report = match topology {
                Topology::Standalone => self.engine.update_standalone(&payload),
                Topology::HighAvailability => self.engine.update(&payload, instance),
            };
            reports.push((instance.name().to_string(), report));
        }

        debug!(answered = reports.len(), total = self.instances.len(), "poll round done");
        reports
    }

    /// Poll on every tick until `shutdown` becomes `true` or its sender is
    /// dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            instances = self.instances.len(),
            interval_secs = self.config.poll_interval.as_secs_f64(),
            "Stats poller started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Stats poller stopped");
    }
}
