//! Prometheus registry holding the live value of every catalog metric.
//!
//! ## Usage
//!
//! Build one [`MetricRegistry`] at startup from a [`Catalog`] and share it
//! through an `Arc` with the update engine (writer) and the scrape server
//! (reader). Nothing here is global, so tests construct as many isolated
//! registries as they like.
//!
//! ## Metric shapes
//!
//! | Topology | Group | Prometheus type | Labels |
//! |----------|-------|-----------------|--------|
//! | standalone | base categories | `Gauge` | none |
//! | HA | base categories, RPC latencies | `GaugeVec` | `instance_name` |
//! | HA | coordinator aggregates | `Counter` (exposed as `{name}_total`) | none |
//!
//! Writes and [`MetricRegistry::value`] always take the payload key
//! (`BecomeLeaderSuccess`); only the exposition carries the counter suffix.

use std::collections::{BTreeSet, HashMap};

use prometheus::proto::{MetricFamily, MetricType};
use prometheus::{Counter, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::catalog::{Catalog, MetricDescriptor, MetricGroup, MetricKind, Topology, INSTANCE_LABEL};

/// Errors produced by registry construction or writes.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Building or registering a collector failed.
    #[error("failed to register metric '{name}': {source}")]
    Registration {
        /// Metric being registered.
        name: String,
        /// Underlying prometheus error.
        #[source]
        source: prometheus::Error,
    },

    /// A labeled metric was written without an instance name.
    #[error("metric '{name}' is labeled by instance_name but no instance name was given")]
    MissingInstanceName {
        /// Metric being written.
        name: String,
    },

    /// An unlabeled metric was written with an instance name.
    #[error("metric '{name}' carries no instance_name label (got '{instance}')")]
    UnexpectedInstanceName {
        /// Metric being written.
        name: String,
        /// The instance name that was supplied.
        instance: String,
    },

    /// `set` on a counter or `increment` on a gauge.
    #[error("metric '{name}' is a {kind} and does not support {operation}")]
    KindMismatch {
        /// Metric being written.
        name: String,
        /// Actual kind of the metric.
        kind: MetricKind,
        /// The rejected operation.
        operation: &'static str,
    },

    /// A counter increment that would decrease or poison the counter.
    #[error("counter '{name}' cannot be incremented by {amount}")]
    NonMonotonic {
        /// Counter being written.
        name: String,
        /// Rejected amount.
        amount: f64,
    },
}

enum Handle {
    Gauge(Gauge),
    LabeledGauge(GaugeVec),
    Counter(Counter),
}

impl Handle {
    fn kind(&self) -> MetricKind {
        match self {
            Handle::Gauge(_) | Handle::LabeledGauge(_) => MetricKind::Gauge,
            Handle::Counter(_) => MetricKind::Counter,
        }
    }
}

/// Live metric state for one catalog.
pub struct MetricRegistry {
    registry: Registry,
    topology: Topology,
    handles: HashMap<MetricGroup, HashMap<String, Handle>>,
    // Payload key -> exposed name, for metrics whose names differ.
    exposed: HashMap<String, String>,
    registered: usize,
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("topology", &self.topology)
            .field("registered", &self.registered)
            .finish()
    }
}

impl MetricRegistry {
    /// Create and register one collector per catalog descriptor in a fresh
    /// private `prometheus::Registry`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Registration`] if a metric name is not a
    /// valid Prometheus identifier or clashes with an existing collector.
    pub fn new(catalog: &Catalog) -> Result<Self, RegistryError> {
        let registry = Registry::new();
        let mut handles: HashMap<MetricGroup, HashMap<String, Handle>> = HashMap::new();
        let mut exposed = HashMap::new();
        let mut registered = 0;

        for descriptor in catalog.iter() {
            let handle = build_handle(&registry, descriptor)?;
            let exposed_name = descriptor.exposed_name();
            if exposed_name != descriptor.name {
                exposed.insert(descriptor.name.clone(), exposed_name);
            }
            handles
                .entry(descriptor.group)
                .or_default()
                .insert(descriptor.name.clone(), handle);
            registered += 1;
        }

        Ok(Self {
            registry,
            topology: catalog.topology(),
            handles,
            exposed,
            registered,
        })
    }

    /// Topology the registry was built for.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.registered
    }

    /// `true` if no metric is registered.
    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    /// `true` if `key` is a registered metric of `group`.
    pub fn contains(&self, group: MetricGroup, key: &str) -> bool {
        self.handle(group, key).is_some()
    }

    /// Kind of the metric `key` in `group`, if registered.
    pub fn kind(&self, group: MetricGroup, key: &str) -> Option<MetricKind> {
        self.handle(group, key).map(Handle::kind)
    }

    fn handle(&self, group: MetricGroup, key: &str) -> Option<&Handle> {
        self.handles.get(&group).and_then(|metrics| metrics.get(key))
    }

    /// Overwrite the current value of a gauge.
    ///
    /// Returns `Ok(false)` without touching anything when `key` is not part
    /// of `group`: the catalog is closed and unknown keys are skipped.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::MissingInstanceName`] / [`RegistryError::UnexpectedInstanceName`]
    ///   when `instance_name` does not match the metric's labeling.
    /// - [`RegistryError::KindMismatch`] when `key` is a counter.
    pub fn set(
        &self,
        group: MetricGroup,
        key: &str,
        value: f64,
        instance_name: Option<&str>,
    ) -> Result<bool, RegistryError> {
        let Some(handle) = self.handle(group, key) else {
            return Ok(false);
        };

        match (handle, instance_name) {
            (Handle::Gauge(gauge), None) => gauge.set(value),
            (Handle::LabeledGauge(vec), Some(instance)) => {
                vec.with_label_values(&[instance]).set(value)
            }
            (Handle::LabeledGauge(_), None) => {
                return Err(RegistryError::MissingInstanceName { name: key.into() })
            }
            (Handle::Gauge(_), Some(instance)) => {
                return Err(RegistryError::UnexpectedInstanceName {
                    name: key.into(),
                    instance: instance.into(),
                })
            }
            (Handle::Counter(_), _) => {
                return Err(RegistryError::KindMismatch {
                    name: key.into(),
                    kind: MetricKind::Counter,
                    operation: "set",
                })
            }
        }
        Ok(true)
    }

    /// Add `amount` to a counter.
    ///
    /// Returns `Ok(false)` when `key` is not part of `group`. Counters are
    /// never labeled, so `instance_name` must be `None`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NonMonotonic`] for negative or non-finite amounts.
    /// - [`RegistryError::UnexpectedInstanceName`] if an instance name is given.
    /// - [`RegistryError::KindMismatch`] when `key` is a gauge.
    pub fn increment(
        &self,
        group: MetricGroup,
        key: &str,
        amount: f64,
        instance_name: Option<&str>,
    ) -> Result<bool, RegistryError> {
        let Some(handle) = self.handle(group, key) else {
            return Ok(false);
        };

        let Handle::Counter(counter) = handle else {
            return Err(RegistryError::KindMismatch {
                name: key.into(),
                kind: MetricKind::Gauge,
                operation: "increment",
            });
        };
        if let Some(instance) = instance_name {
            return Err(RegistryError::UnexpectedInstanceName {
                name: key.into(),
                instance: instance.into(),
            });
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(RegistryError::NonMonotonic {
                name: key.into(),
                amount,
            });
        }

        counter.inc_by(amount);
        Ok(true)
    }

    /// Snapshot every metric family with at least one sample.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Gather and encode all metrics in the Prometheus text exposition format.
    ///
    /// Returns an empty string if encoding fails; a scrape must never take
    /// the exporter down.
    pub fn gather_metrics(&self) -> String {
        let families = self.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if encoder.encode(&families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Current sample of metric `name` (the payload key, without any
    /// counter suffix).
    ///
    /// For labeled metrics pass the instance name; `None` selects the
    /// unlabeled sample. Returns `None` if the sample was never written
    /// (labeled series) or the metric does not exist.
    ///
    /// Diagnostic helper for tests and debugging: every call gathers the
    /// whole registry and scans it linearly. Not for the update path.
    pub fn value(&self, name: &str, instance_name: Option<&str>) -> Option<f64> {
        let name = self.exposed.get(name).map_or(name, String::as_str);
        let families = self.gather();
        let family = families.iter().find(|f| f.get_name() == name)?;
        let metric = family.get_metric().iter().find(|m| {
            let label = m
                .get_label()
                .iter()
                .find(|l| l.get_name() == INSTANCE_LABEL)
                .map(|l| l.get_value());
            label == instance_name
        })?;
        Some(sample_value(family.get_field_type(), metric))
    }

    /// Every `(metric, value)` sample currently held for `instance_name`,
    /// sorted by metric name.
    ///
    /// Like [`MetricRegistry::value`], this gathers the whole registry per
    /// call and is meant for tests and diagnostics.
    pub fn samples_for_instance(&self, instance_name: &str) -> Vec<(String, f64)> {
        let mut samples = Vec::new();
        for family in self.gather() {
            for metric in family.get_metric() {
                let matches = metric
                    .get_label()
                    .iter()
                    .any(|l| l.get_name() == INSTANCE_LABEL && l.get_value() == instance_name);
                if matches {
                    samples.push((
                        family.get_name().to_string(),
                        sample_value(family.get_field_type(), metric),
                    ));
                }
            }
        }
        samples.sort_by(|a, b| a.0.cmp(&b.0));
        samples
    }

    /// Structured overview used by the health endpoint.
    pub fn summary(&self) -> RegistrySummary {
        let mut summary = RegistrySummary {
            topology: self.topology,
            registered_metrics: self.registered,
            ..RegistrySummary::default()
        };

        for family in self.gather() {
            for metric in family.get_metric() {
                if let Some(label) = metric
                    .get_label()
                    .iter()
                    .find(|l| l.get_name() == INSTANCE_LABEL)
                {
                    summary.labeled_series += 1;
                    summary.instances.insert(label.get_value().to_string());
                }
            }
        }

        summary
    }
}

/// Snapshot of registry occupancy.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegistrySummary {
    /// Deployment topology.
    pub topology: Topology,
    /// Number of catalog metrics registered.
    pub registered_metrics: usize,
    /// Number of `instance_name`-labeled series written so far.
    pub labeled_series: usize,
    /// Instance names that have reported at least one labeled sample.
    pub instances: BTreeSet<String>,
}

fn build_handle(registry: &Registry, descriptor: &MetricDescriptor) -> Result<Handle, RegistryError> {
    let registration = |source| RegistryError::Registration {
        name: descriptor.name.clone(),
        source,
    };
    let opts = Opts::new(descriptor.exposed_name(), descriptor.description.clone());

    let handle = match (descriptor.kind, descriptor.labeled) {
        (MetricKind::Gauge, false) => {
            let gauge = Gauge::with_opts(opts).map_err(registration)?;
            registry
                .register(Box::new(gauge.clone()))
                .map_err(registration)?;
            Handle::Gauge(gauge)
        }
        (MetricKind::Gauge, true) => {
            let vec = GaugeVec::new(opts, descriptor.label_names()).map_err(registration)?;
            registry
                .register(Box::new(vec.clone()))
                .map_err(registration)?;
            Handle::LabeledGauge(vec)
        }
        // Aggregate counters are cluster-wide totals; a labeled counter is
        // registered unlabeled as well.
        (MetricKind::Counter, _) => {
            let counter = Counter::with_opts(opts).map_err(registration)?;
            registry
                .register(Box::new(counter.clone()))
                .map_err(registration)?;
            Handle::Counter(counter)
        }
    };

    Ok(handle)
}

fn sample_value(kind: MetricType, metric: &prometheus::proto::Metric) -> f64 {
    match kind {
        MetricType::COUNTER => metric.get_counter().get_value(),
        _ => metric.get_gauge().get_value(),
    }
}
