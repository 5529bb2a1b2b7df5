//! # Update Engine
//!
//! ## Responsibility
//! Take one decoded statistics payload and the instance that produced it and
//! fan the payload out into the [`MetricRegistry`].
//!
//! ## Routing
//!
//! | Source | Payload category | Registry group | Write | Label |
//! |--------|------------------|----------------|-------|-------|
//! | standalone | every base category | same category | set | none |
//! | data instance | every base category | same category | set | instance name |
//! | data instance | `HighAvailability` | data-instance RPC latencies | set | instance name |
//! | coordinator | `General` | `General` | set | instance name |
//! | coordinator | `HighAvailability` | coordinator RPC latencies | set | instance name |
//! | coordinator | `HighAvailability` | coordinator aggregates | increment | none |
//!
//! ## Guarantees
//! - Each route runs inside its own error boundary. A missing section, a
//!   section that is not an object or a non-numeric value for a catalog key
//!   fails that route only; the failure is logged and the next route runs.
//! - A failed route writes nothing: values are validated before any write.
//! - Keys outside the catalog are skipped; catalog metrics missing from the
//!   payload keep their previous value.
//! - [`UpdateEngine::update`] never panics and never returns an error.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::catalog::{Category, MetricGroup};
use crate::instance::{Instance, InstanceRole};
use crate::registry::{MetricRegistry, RegistryError};

/// Decoded statistics payload: category name → `{metric_key: number}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StatsPayload(Map<String, Value>);

impl StatsPayload {
    /// Wrap an already-decoded JSON object.
    pub fn new(sections: Map<String, Value>) -> Self {
        Self(sections)
    }

    /// Decode a payload from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the bytes are not a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Section for `category`.
    ///
    /// # Errors
    ///
    /// - [`RouteError::MissingCategory`] if the payload has no such key.
    /// - [`RouteError::NotAnObject`] if the section is not a JSON object.
    pub fn section(&self, category: Category) -> Result<&Map<String, Value>, RouteError> {
        let value = self
            .0
            .get(category.as_str())
            .ok_or(RouteError::MissingCategory { category })?;
        value.as_object().ok_or(RouteError::NotAnObject {
            category,
            found: json_type(value),
        })
    }
}

impl From<Map<String, Value>> for StatsPayload {
    fn from(sections: Map<String, Value>) -> Self {
        Self(sections)
    }
}

/// Why a single route could not be applied.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The payload carries no section for the category.
    #[error("category {category} is missing from the payload")]
    MissingCategory {
        /// Category that was looked up.
        category: Category,
    },

    /// The section exists but is not a JSON object.
    #[error("category {category} is a {found}, expected an object")]
    NotAnObject {
        /// Category that was looked up.
        category: Category,
        /// JSON type actually found.
        found: &'static str,
    },

    /// A catalog key carries a value that is not a finite number.
    #[error("metric {key} in category {category} is a {found}, expected a number")]
    NotANumber {
        /// Category holding the value.
        category: Category,
        /// Offending key.
        key: String,
        /// JSON type actually found.
        found: &'static str,
    },

    /// A counter delta is negative.
    #[error("metric {key} in category {category} has negative delta {amount}")]
    NegativeDelta {
        /// Category holding the value.
        category: Category,
        /// Offending key.
        key: String,
        /// Rejected delta.
        amount: f64,
    },

    /// The registry rejected a write.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Write {
    Set,
    Increment,
}

#[derive(Debug, Clone, Copy)]
struct Route {
    group: MetricGroup,
    write: Write,
    labeled: bool,
}

impl Route {
    const fn set(category: Category, labeled: bool) -> Self {
        Self {
            group: MetricGroup::Base(category),
            write: Write::Set,
            labeled,
        }
    }
}

const fn base_routes(labeled: bool) -> [Route; 11] {
    [
        Route::set(Category::General, labeled),
        Route::set(Category::Index, labeled),
        Route::set(Category::Operator, labeled),
        Route::set(Category::Query, labeled),
        Route::set(Category::QueryType, labeled),
        Route::set(Category::Session, labeled),
        Route::set(Category::Snapshot, labeled),
        Route::set(Category::Stream, labeled),
        Route::set(Category::Transaction, labeled),
        Route::set(Category::Trigger, labeled),
        Route::set(Category::Ttl, labeled),
    ]
}

const STANDALONE_ROUTES: [Route; 11] = base_routes(false);

const DATA_INSTANCE_BASE_ROUTES: [Route; 11] = base_routes(true);

const DATA_INSTANCE_HA_ROUTE: Route = Route {
    group: MetricGroup::HaDataInstance,
    write: Write::Set,
    labeled: true,
};

const COORDINATOR_ROUTES: [Route; 3] = [
    Route::set(Category::General, true),
    Route {
        group: MetricGroup::HaCoordinator,
        write: Write::Set,
        labeled: true,
    },
    Route {
        group: MetricGroup::HaCoordinatorAggregate,
        write: Write::Increment,
        labeled: false,
    },
];

/// A route that failed during one update.
#[derive(Debug)]
pub struct RouteFailure {
    /// Registry group the route was writing to.
    pub group: MetricGroup,
    /// Cause of the failure.
    pub error: RouteError,
}

/// Outcome of one update call.
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Number of registry writes applied.
    pub written: usize,
    /// Routes applied without error.
    pub routes_ok: usize,
    /// Routes that failed and were skipped.
    pub failures: Vec<RouteFailure>,
}

impl UpdateReport {
    /// `true` if every route succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// `true` if the route feeding `group` failed.
    pub fn failed(&self, group: MetricGroup) -> bool {
        self.failures.iter().any(|f| f.group == group)
    }
}

/// Routes statistics payloads into a shared [`MetricRegistry`].
#[derive(Debug, Clone)]
pub struct UpdateEngine {
    registry: Arc<MetricRegistry>,
}

impl UpdateEngine {
    /// Create an engine writing to `registry`.
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this engine writes to.
    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Route `payload`, reported by `instance`, into the HA registry.
    pub fn update(&self, payload: &StatsPayload, instance: &Instance) -> UpdateReport {
        let name = Some(instance.name());
        match instance.role() {
            InstanceRole::DataInstance => {
                let mut report = self.apply(payload, &DATA_INSTANCE_BASE_ROUTES, name);
                report.merge(self.apply(payload, &[DATA_INSTANCE_HA_ROUTE], name));
                report
            }
            InstanceRole::Coordinator => self.apply(payload, &COORDINATOR_ROUTES, name),
        }
    }

    /// Route `payload` from the single instance of a standalone deployment.
    pub fn update_standalone(&self, payload: &StatsPayload) -> UpdateReport {
        self.apply(payload, &STANDALONE_ROUTES, None)
    }

    fn apply(&self, payload: &StatsPayload, routes: &[Route], instance: Option<&str>) -> UpdateReport {
        let mut report = UpdateReport::default();

        for route in routes {
            match self.apply_route(payload, route, instance) {
                Ok(written) => {
                    report.written += written;
                    report.routes_ok += 1;
                }
                Err(e) => {
                    error!(
                        instance = instance.unwrap_or("standalone"),
                        group = %route.group,
                        error = %e,
                        "Error occurred while updating metrics"
                    );
                    report.failures.push(RouteFailure {
                        group: route.group,
                        error: e,
                    });
                }
            }
        }

        debug!(
            instance = instance.unwrap_or("standalone"),
            written = report.written,
            failed = report.failures.len(),
            "metrics updated"
        );
        report
    }

    fn apply_route(
        &self,
        payload: &StatsPayload,
        route: &Route,
        instance: Option<&str>,
    ) -> Result<usize, RouteError> {
        let category = route.group.category();
        let section = payload.section(category)?;

        let mut values = Vec::with_capacity(section.len());
        for (key, value) in section {
            if !self.registry.contains(route.group, key) {
                continue;
            }
            let number = value
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| RouteError::NotANumber {
                    category,
                    key: key.clone(),
                    found: json_type(value),
                })?;
            if route.write == Write::Increment && number < 0.0 {
                return Err(RouteError::NegativeDelta {
                    category,
                    key: key.clone(),
                    amount: number,
                });
            }
            values.push((key.as_str(), number));
        }

        let label = if route.labeled { instance } else { None };
        let mut written = 0;
        for (key, number) in values {
            let applied = match route.write {
                Write::Set => self.registry.set(route.group, key, number, label)?,
                Write::Increment => self.registry.increment(route.group, key, number, label)?,
            };
            if applied {
                written += 1;
            }
        }
        Ok(written)
    }
}

impl UpdateReport {
    fn merge(&mut self, other: UpdateReport) {
        self.written += other.written;
        self.routes_ok += other.routes_ok;
        self.failures.extend(other.failures);
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
