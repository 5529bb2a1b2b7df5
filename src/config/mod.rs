//! # Exporter Configuration
//!
//! ## Responsibility
//! Parse and validate the TOML file describing the exporter itself (listen
//! port, pull frequency, deployment topology) and the Memgraph instances it
//! polls.
//!
//! ## Guarantees
//! - Deterministic: the same TOML input always produces the same `ExporterConfig`
//! - Validated: all semantic constraints are checked before a config is accepted
//! - Fail-fast: an unknown instance `type` is rejected at parse time
//! - Schema-exportable: JSON Schema output enables IDE autocomplete
//!
//! ## NOT Responsible For
//! - Polling instances (that belongs to `poller`)
//! - Serving metrics (that belongs to `metrics_server`)

pub mod loader;
pub mod validation;

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::Topology;
use crate::instance::{Instance, InstanceRole};

// ── Default value functions ──────────────────────────────────────────────

/// Default exporter listen port: 9115.
fn default_port() -> u16 {
    9115
}

/// Default pull frequency: 5 seconds.
fn default_pull_frequency_seconds() -> u64 {
    5
}

/// Default upstream request timeout: 5000ms.
fn default_request_timeout_ms() -> u64 {
    5000
}

// ── Top-level config ─────────────────────────────────────────────────────

/// Root configuration of the exporter.
///
/// # Example
///
/// ```toml
/// [exporter]
/// port = 9115
/// pull_frequency_seconds = 5
/// deployment = "HA"
///
/// [[instances]]
/// name = "data_1"
/// url = "http://localhost"
/// port = 9091
/// type = "data_instance"
///
/// [[instances]]
/// name = "coord_1"
/// url = "http://localhost"
/// port = 9094
/// type = "coordinator"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ExporterConfig {
    /// Settings of the exporter process.
    #[serde(default)]
    pub exporter: ExporterSection,
    /// Memgraph instances to poll.
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// Settings of the exporter process.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ExporterSection {
    /// Port the `/metrics` endpoint listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds between two polling rounds.
    #[serde(default = "default_pull_frequency_seconds")]
    pub pull_frequency_seconds: u64,
    /// Timeout for one upstream stats request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Standalone or HA deployment.
    #[serde(default)]
    pub deployment: Topology,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            pull_frequency_seconds: default_pull_frequency_seconds(),
            request_timeout_ms: default_request_timeout_ms(),
            deployment: Topology::default(),
        }
    }
}

/// One polled Memgraph instance as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct InstanceConfig {
    /// Unique name; becomes the `instance_name` label in HA mode.
    pub name: String,
    /// Scheme and host of the stats endpoint (e.g. `http://localhost`).
    pub url: String,
    /// Port of the stats endpoint.
    pub port: u16,
    /// Cluster role. Required in HA deployments; standalone instances
    /// default to `data_instance`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<InstanceRole>,
}

impl InstanceConfig {
    fn to_instance(&self) -> Instance {
        Instance::new(
            self.name.clone(),
            self.url.clone(),
            self.port,
            self.role.unwrap_or(InstanceRole::DataInstance),
        )
    }
}

impl ExporterConfig {
    /// Polling targets in configuration order.
    pub fn instances(&self) -> Vec<Instance> {
        self.instances.iter().map(InstanceConfig::to_instance).collect()
    }

    /// Socket address of the `/metrics` endpoint (all interfaces).
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.exporter.port))
    }

    /// Interval between polling rounds.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.exporter.pull_frequency_seconds)
    }

    /// Timeout for one upstream request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.exporter.request_timeout_ms)
    }
}

/// Export the JSON Schema for [`ExporterConfig`].
///
/// # Errors
///
/// Returns `serde_json::Error` if serialization fails (should not happen).
pub fn export_schema() -> Result<String, serde_json::Error> {
    let schema = schemars::schema_for!(ExporterConfig);
    serde_json::to_string_pretty(&schema)
}
