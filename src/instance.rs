//! Polling targets.
//!
//! An [`Instance`] is built once from configuration and never mutated. Its
//! [`InstanceRole`] is a closed enum: an unrecognised role string fails to
//! deserialize, so a bad role surfaces when the config is loaded instead of
//! during steady-state polling.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Role of a cluster member. Decides which payload categories are routed
/// and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InstanceRole {
    /// Stores graph data and serves queries.
    DataInstance,
    /// Runs leader election and failover.
    Coordinator,
}

impl fmt::Display for InstanceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceRole::DataInstance => f.write_str("data_instance"),
            InstanceRole::Coordinator => f.write_str("coordinator"),
        }
    }
}

/// One Memgraph process whose statistics endpoint is polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    name: String,
    url: String,
    port: u16,
    role: InstanceRole,
}

impl Instance {
    /// Create an instance. `url` is the scheme and host, without the port
    /// (e.g. `http://localhost`).
    pub fn new(name: impl Into<String>, url: impl Into<String>, port: u16, role: InstanceRole) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            port,
            role,
        }
    }

    /// Unique name, used as the `instance_name` label value.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scheme and host of the statistics endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Port of the statistics endpoint.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Cluster role.
    pub fn role(&self) -> InstanceRole {
        self.role
    }

    /// Full URL polled for statistics.
    pub fn stats_url(&self) -> String {
        format!("{}:{}", self.url.trim_end_matches('/'), self.port)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Instance(name={}, url={}, port={}, role={})",
            self.name, self.url, self.port, self.role
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_deserializes_from_snake_case() {
        let role: InstanceRole = serde_json::from_str("\"data_instance\"").expect("parse");
        assert_eq!(role, InstanceRole::DataInstance);
        let role: InstanceRole = serde_json::from_str("\"coordinator\"").expect("parse");
        assert_eq!(role, InstanceRole::Coordinator);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result = serde_json::from_str::<InstanceRole>("\"replica-set\"");
        assert!(result.is_err(), "unknown roles must fail to parse");
    }

    #[test]
    fn test_stats_url_joins_host_and_port() {
        let instance = Instance::new("data0", "http://localhost/", 9091, InstanceRole::DataInstance);
        assert_eq!(instance.stats_url(), "http://localhost:9091");
    }

    #[test]
    fn test_display_lists_fields() {
        let instance = Instance::new("coord1", "http://10.0.0.5", 9091, InstanceRole::Coordinator);
        assert_eq!(
            instance.to_string(),
            "Instance(name=coord1, url=http://10.0.0.5, port=9091, role=coordinator)"
        );
    }
}
