//! # Metric Catalog
//!
//! ## Responsibility
//! Define, once, every metric the exporter can publish: its external name,
//! its help text, the catalog group it belongs to and whether it is a gauge
//! or a counter. Two catalogs exist:
//!
//! - **standalone**: the eleven base categories, unlabeled.
//! - **high availability**: the same base categories labeled by
//!   `instance_name`, plus the per-data-instance RPC latencies, the
//!   per-coordinator RPC latencies and the cross-coordinator aggregate
//!   counters (unlabeled).
//!
//! ## Guarantees
//! - Percentile metric names follow `{rpc}_us_{percentile}p` exactly.
//! - Every metric name is unique across the whole catalog; construction
//!   fails with [`CatalogError::DuplicateMetric`] otherwise.
//!
//! ## NOT Responsible For
//! - Holding live metric values (that belongs to `registry`)
//! - Deciding which payload section feeds which group (that belongs to `engine`)

use std::collections::HashSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label attached to every per-instance metric in HA deployments.
pub const INSTANCE_LABEL: &str = "instance_name";

/// Suffix appended to counter names in the exposition, matching the
/// Prometheus client convention dashboards query (`rate(X_total[..])`).
pub const COUNTER_SUFFIX: &str = "_total";

/// Percentiles pre-computed by the database for every latency timer.
pub const PERCENTILES: [u8; 3] = [50, 90, 99];

// ── Static tables ────────────────────────────────────────────────────────

const GENERAL: &[(&str, &str)] = &[
    ("average_degree", "Average node degree."),
    ("disk_usage", "Amount of disk usage."),
    ("edge_count", "Edge count."),
    ("memory_usage", "Amount of memory usage."),
    ("peak_memory_usage", "Peak memory usage."),
    ("unreleased_delta_objects", "Number of unreleased delta objects."),
    ("vertex_count", "Vertex count."),
];

/// Latency timers reported in the `General` section.
const GENERAL_TIMERS: &[&str] = &["SocketConnect"];

const INDEX: &[(&str, &str)] = &[
    ("ActiveLabelIndices", "Number of active label indices in the system."),
    (
        "ActiveLabelPropertyIndices",
        "Number of active label property indices in the system.",
    ),
    ("ActivePointIndices", "Number of active point indices in the system."),
    ("ActiveTextIndices", "Number of active text indices in the system."),
];

const OPERATORS: &[&str] = &[
    "AccumulateOperator",
    "AggregateOperator",
    "ApplyOperator",
    "CallProcedureOperator",
    "CartesianOperator",
    "ConstructNamedPathOperator",
    "CreateExpandOperator",
    "CreateNodeOperator",
    "DeleteOperator",
    "DistinctOperator",
    "EdgeUniquenessFilterOperator",
    "EmptyResultOperator",
    "EvaluatePatternFilterOperator",
    "ExpandOperator",
    "ExpandVariableOperator",
    "FilterOperator",
    "ForeachOperator",
    "HashJoinOperator",
    "IndexedJoinOperator",
    "LimitOperator",
    "MergeOperator",
    "OnceOperator",
    "OptionalOperator",
    "OrderByOperator",
    "PeriodicCommitOperator",
    "PeriodicSubqueryOperator",
    "ProduceOperator",
    "RemoveLabelsOperator",
    "RemovePropertyOperator",
    "RollUpApplyOperator",
    "ScanAllByEdgeIdOperator",
    "ScanAllByEdgeOperator",
    "ScanAllByEdgeTypeOperator",
    "ScanAllByEdgeTypePropertyOperator",
    "ScanAllByEdgeTypePropertyRangeOperator",
    "ScanAllByEdgeTypePropertyValueOperator",
    "ScanAllByIdOperator",
    "ScanAllByLabelOperator",
    "ScanAllByLabelPropertyOperator",
    "ScanAllByLabelPropertyRangeOperator",
    "ScanAllByLabelPropertyValueOperator",
    "ScanAllByPointDistanceOperator",
    "ScanAllByPointWithinbboxOperator",
    "ScanAllOperator",
    "SetLabelsOperator",
    "SetPropertiesOperator",
    "SetPropertyOperator",
    "SkipOperator",
    "UnionOperator",
    "UnwindOperator",
];

const QUERY: &[(&str, &str)] = &[
    (
        "QueryExecutionLatency_us_99p",
        "Query execution latency in microseconds, 99th percentile",
    ),
    (
        "QueryExecutionLatency_us_90p",
        "Query execution latency in microseconds, 90th percentile",
    ),
    (
        "QueryExecutionLatency_us_50p",
        "Query execution latency in microseconds, 50th percentile",
    ),
];

const QUERY_TYPE: &[(&str, &str)] = &[
    ("ReadQuery", "Number of read-only queries executed."),
    ("ReadWriteQuery", "Number of read-write queries executed."),
    ("WriteQuery", "Number of write-only queries executed."),
];

const SESSION: &[(&str, &str)] = &[
    ("ActiveBoltSessions", "Number of active Bolt connections."),
    ("ActiveSSLSessions", "Number of active SSL connections."),
    ("ActiveSessions", "Number of active connections."),
    ("ActiveTCPSessions", "Number of active TCP connections."),
    ("ActiveWebSocketSessions", "Number of active websocket connections."),
    ("BoltMessages", "Number of Bolt messages sent."),
];

const SNAPSHOT: &[(&str, &str)] = &[
    (
        "SnapshotCreationLatency_us_99p",
        "Snapshot creation latency in microseconds, 99th percentile.",
    ),
    (
        "SnapshotCreationLatency_us_90p",
        "Snapshot creation latency in microseconds, 90th percentile.",
    ),
    (
        "SnapshotCreationLatency_us_50p",
        "Snapshot creation latency in microseconds, 50th percentile.",
    ),
    (
        "SnapshotRecoveryLatency_us_99p",
        "Snapshot recovery latency in microseconds, 99th percentile.",
    ),
    (
        "SnapshotRecoveryLatency_us_90p",
        "Snapshot recovery latency in microseconds, 90th percentile.",
    ),
    (
        "SnapshotRecoveryLatency_us_50p",
        "Snapshot recovery latency in microseconds, 50th percentile.",
    ),
];

const STREAM: &[(&str, &str)] = &[
    ("MessagesConsumed", "Number of consumed streamed messages."),
    ("StreamsCreated", "Number of Streams created."),
];

const TRANSACTION: &[(&str, &str)] = &[
    ("ActiveTransactions", "Number of active transactions."),
    ("CommitedTransactions", "Number of committed transactions."),
    ("FailedPrepare", "Number of failed prepare queries."),
    ("FailedPull", "Number of failed pulls."),
    ("FailedQuery", "Number of times executing a query failed."),
    ("RollbackedTransactions", "Number of rollbacked transactions."),
    ("SuccessfulQuery", "Number of successful queries"),
];

const TRIGGER: &[(&str, &str)] = &[
    ("TriggersCreated", "Number of Triggers created."),
    ("TriggersExecuted", "Number of Triggers executed."),
];

const TTL: &[(&str, &str)] = &[
    ("DeletedEdges", "Number of deleted TTL edges."),
    ("DeletedNodes", "Number of deleted TTL nodes."),
];

const HA_DATA_INSTANCE_RPCS: &[&str] = &[
    "AppendDeltasRpc",
    "CurrentWalRpc",
    "WalFilesRpc",
    "SnapshotRpc",
    "FrequentHeartbeatRpc",
    "HeartbeatRpc",
    "ReplicaStream",
    "SystemRecoveryRpc",
];

const HA_COORDINATOR_RPCS: &[&str] = &[
    "ChooseMostUpToDateInstance",
    "DemoteMainToReplicaRpc",
    "EnableWritingOnMainRpc",
    "GetDatabaseHistoriesRpc",
    "GetHistories",
    "InstanceFailCallback",
    "InstanceSuccCallback",
    "PromoteToMainRpc",
    "RegisterReplicaOnMainRpc",
    "StateCheckRpc",
    "UnregisterReplicaRpc",
];

const HA_COORDINATOR_EVENTS: &[(&str, &str)] = &[
    ("BecomeLeaderSuccess", "How many times coordinators successfully became leaders"),
    ("FailedToBecomeLeader", "How many times coordinator failed to become leader"),
    ("SuccessfulFailovers", "How many times the failover was done successfully"),
    (
        "RaftFailedFailovers",
        "How many times failover failed because writing to Raft failed",
    ),
    (
        "NoAliveInstanceFailedFailovers",
        "How many times failover failed because no instance was alive",
    ),
    ("ShowInstance", "How many times SHOW INSTANCE query was called"),
    ("ShowInstances", "How many times SHOW INSTANCES query was called"),
    ("DemoteInstance", "How many times the user manually demoted instance"),
    (
        "UnregisterReplInstance",
        "How many times the user tried to unregister replication instance",
    ),
    (
        "RemoveCoordInstance",
        "How many times the user tried to remove coordinator instance",
    ),
];

/// RPCs whose outcome the coordinators count as `{rpc}Fail` / `{rpc}Success`.
const HA_COORDINATOR_RPC_OUTCOMES: &[&str] = &[
    "StateCheckRpc",
    "UnregisterReplicaRpc",
    "EnableWritingOnMainRpc",
    "PromoteToMainRpc",
    "DemoteMainToReplicaRpc",
    "RegisterReplicaOnMainRpc",
    "SwapMainUUIDRpc",
    "GetDatabaseHistoriesRpc",
];

// ── Categories and groups ────────────────────────────────────────────────

/// A top-level section of the statistics payload.
///
/// The string form ([`Category::as_str`]) is the exact JSON key the
/// database uses for the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Index statistics.
    Index,
    /// Per-operator call counts.
    Operator,
    /// Query execution latencies.
    Query,
    /// Read / write query counts.
    QueryType,
    /// Connection and session counts.
    Session,
    /// Snapshot creation and recovery latencies.
    Snapshot,
    /// Stream consumption counts.
    Stream,
    /// Transaction outcome counts.
    Transaction,
    /// Trigger counts.
    Trigger,
    /// Time-to-live deletions.
    Ttl,
    /// Storage-wide figures such as vertex and edge counts.
    General,
    /// Replication and coordination statistics of an HA cluster.
    HighAvailability,
}

impl Category {
    /// The eleven categories shared by both deployment topologies.
    pub const BASE: [Category; 11] = [
        Category::General,
        Category::Index,
        Category::Operator,
        Category::Query,
        Category::QueryType,
        Category::Session,
        Category::Snapshot,
        Category::Stream,
        Category::Transaction,
        Category::Trigger,
        Category::Ttl,
    ];

    /// The payload key for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Index => "Index",
            Category::Operator => "Operator",
            Category::Query => "Query",
            Category::QueryType => "QueryType",
            Category::Session => "Session",
            Category::Snapshot => "Snapshot",
            Category::Stream => "Stream",
            Category::Transaction => "Transaction",
            Category::Trigger => "Trigger",
            Category::Ttl => "TTL",
            Category::General => "General",
            Category::HighAvailability => "HighAvailability",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A disjoint partition of the catalog backed by its own set of metrics.
///
/// Base categories map one-to-one onto groups. The `HighAvailability`
/// section feeds three groups whose metrics never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricGroup {
    /// Gauges fed by a base payload category.
    Base(Category),
    /// RPC latencies reported by data instances.
    HaDataInstance,
    /// RPC latencies reported by coordinators.
    HaCoordinator,
    /// Cluster-wide event counters summed across coordinators.
    HaCoordinatorAggregate,
}

impl MetricGroup {
    /// The payload category this group reads from.
    pub fn category(self) -> Category {
        match self {
            MetricGroup::Base(category) => category,
            MetricGroup::HaDataInstance
            | MetricGroup::HaCoordinator
            | MetricGroup::HaCoordinatorAggregate => Category::HighAvailability,
        }
    }
}

impl fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricGroup::Base(category) => write!(f, "{category}"),
            MetricGroup::HaDataInstance => f.write_str("HighAvailability/data_instance"),
            MetricGroup::HaCoordinator => f.write_str("HighAvailability/coordinator"),
            MetricGroup::HaCoordinatorAggregate => f.write_str("HighAvailability/aggregate"),
        }
    }
}

/// Whether a metric is overwritten or accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Last write wins.
    Gauge,
    /// Monotonic sum of increments.
    Counter,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => f.write_str("gauge"),
            MetricKind::Counter => f.write_str("counter"),
        }
    }
}

/// Deployment shape of the polled database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum Topology {
    /// A single Memgraph instance; metrics carry no instance label.
    #[default]
    #[serde(rename = "standalone")]
    Standalone,
    /// A cluster of data instances and coordinators.
    #[serde(rename = "HA", alias = "high_availability")]
    HighAvailability,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Standalone => f.write_str("standalone"),
            Topology::HighAvailability => f.write_str("HA"),
        }
    }
}

// ── Descriptors ──────────────────────────────────────────────────────────

/// Immutable definition of one exported metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// External metric name, identical to the payload key.
    pub name: String,
    /// Help text.
    pub description: String,
    /// Catalog group owning this metric.
    pub group: MetricGroup,
    /// Gauge or counter.
    pub kind: MetricKind,
    /// Whether samples are keyed by [`INSTANCE_LABEL`].
    pub labeled: bool,
}

impl MetricDescriptor {
    /// Name the metric is exposed under. Counters carry [`COUNTER_SUFFIX`];
    /// gauges are exposed under their payload key.
    pub fn exposed_name(&self) -> String {
        match self.kind {
            MetricKind::Counter => format!("{}{COUNTER_SUFFIX}", self.name),
            MetricKind::Gauge => self.name.clone(),
        }
    }

    /// Label names this metric is registered with.
    pub fn label_names(&self) -> &'static [&'static str] {
        if self.labeled {
            &[INSTANCE_LABEL]
        } else {
            &[]
        }
    }
}

/// Errors raised while assembling a catalog.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Two descriptors share a name.
    #[error("metric '{name}' is defined in both {first} and {second}")]
    DuplicateMetric {
        /// The clashing metric name.
        name: String,
        /// Group of the first definition.
        first: MetricGroup,
        /// Group of the second definition.
        second: MetricGroup,
    },
}

/// Build the `{rpc}_us_{percentile}p` name of a latency gauge.
pub fn latency_metric_name(rpc: &str, percentile: u8) -> String {
    format!("{rpc}_us_{percentile}p")
}

/// The 50th/90th/99th percentile `(name, description)` pairs for one timer.
pub fn latency_triplet(rpc: &str) -> Vec<(String, String)> {
    PERCENTILES
        .iter()
        .map(|&p| {
            (
                latency_metric_name(rpc, p),
                format!("{rpc} latency in microseconds, {p}th percentile"),
            )
        })
        .collect()
}

/// The full, validated set of metric descriptors for one topology.
#[derive(Debug, Clone)]
pub struct Catalog {
    topology: Topology,
    descriptors: Vec<MetricDescriptor>,
}

impl Catalog {
    /// Catalog for a standalone deployment.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateMetric`] if the static tables clash.
    pub fn standalone() -> Result<Self, CatalogError> {
        Self::for_topology(Topology::Standalone)
    }

    /// Catalog for a high-availability deployment.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateMetric`] if the static tables clash.
    pub fn high_availability() -> Result<Self, CatalogError> {
        Self::for_topology(Topology::HighAvailability)
    }

    /// Build the catalog matching `topology` from the static tables.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateMetric`] if the static tables clash.
    pub fn for_topology(topology: Topology) -> Result<Self, CatalogError> {
        let labeled = topology == Topology::HighAvailability;
        let mut descriptors = base_descriptors(labeled);

        if topology == Topology::HighAvailability {
            for rpc in HA_DATA_INSTANCE_RPCS {
                push_pairs(
                    &mut descriptors,
                    latency_triplet(rpc),
                    MetricGroup::HaDataInstance,
                    MetricKind::Gauge,
                    true,
                );
            }
            for rpc in HA_COORDINATOR_RPCS {
                push_pairs(
                    &mut descriptors,
                    latency_triplet(rpc),
                    MetricGroup::HaCoordinator,
                    MetricKind::Gauge,
                    true,
                );
            }
            push_pairs(
                &mut descriptors,
                coordinator_aggregate_pairs(),
                MetricGroup::HaCoordinatorAggregate,
                MetricKind::Counter,
                false,
            );
        }

        Self::from_descriptors(topology, descriptors)
    }

    /// Wrap an explicit descriptor list, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateMetric`] naming the first clash found.
    pub fn from_descriptors(
        topology: Topology,
        descriptors: Vec<MetricDescriptor>,
    ) -> Result<Self, CatalogError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(descriptors.len());
        for (idx, descriptor) in descriptors.iter().enumerate() {
            if !seen.insert(descriptor.name.as_str()) {
                let first = descriptors[..idx]
                    .iter()
                    .find(|d| d.name == descriptor.name)
                    .map_or(descriptor.group, |d| d.group);
                return Err(CatalogError::DuplicateMetric {
                    name: descriptor.name.clone(),
                    first,
                    second: descriptor.group,
                });
            }
        }
        Ok(Self {
            topology,
            descriptors,
        })
    }

    /// Topology this catalog was built for.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// All descriptors in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &MetricDescriptor> {
        self.descriptors.iter()
    }

    /// Descriptors belonging to `group`.
    pub fn group(&self, group: MetricGroup) -> impl Iterator<Item = &MetricDescriptor> {
        self.descriptors.iter().filter(move |d| d.group == group)
    }

    /// Look a descriptor up by metric name.
    pub fn get(&self, name: &str) -> Option<&MetricDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// `true` if the catalog holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn base_descriptors(labeled: bool) -> Vec<MetricDescriptor> {
    let tables: [(Category, &[(&str, &str)]); 10] = [
        (Category::General, GENERAL),
        (Category::Index, INDEX),
        (Category::Query, QUERY),
        (Category::QueryType, QUERY_TYPE),
        (Category::Session, SESSION),
        (Category::Snapshot, SNAPSHOT),
        (Category::Stream, STREAM),
        (Category::Transaction, TRANSACTION),
        (Category::Trigger, TRIGGER),
        (Category::Ttl, TTL),
    ];

    let mut descriptors = Vec::new();
    for (category, table) in tables {
        push_pairs(
            &mut descriptors,
            table
                .iter()
                .map(|(name, description)| (name.to_string(), description.to_string())),
            MetricGroup::Base(category),
            MetricKind::Gauge,
            labeled,
        );
    }

    for timer in GENERAL_TIMERS {
        push_pairs(
            &mut descriptors,
            latency_triplet(timer),
            MetricGroup::Base(Category::General),
            MetricKind::Gauge,
            labeled,
        );
    }

    push_pairs(
        &mut descriptors,
        OPERATORS
            .iter()
            .map(|name| (name.to_string(), format!("Number of times {name} has been called."))),
        MetricGroup::Base(Category::Operator),
        MetricKind::Gauge,
        labeled,
    );

    descriptors
}

fn coordinator_aggregate_pairs() -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = HA_COORDINATOR_EVENTS
        .iter()
        .map(|(name, description)| (name.to_string(), description.to_string()))
        .collect();
    for rpc in HA_COORDINATOR_RPC_OUTCOMES {
        pairs.push((
            format!("{rpc}Fail"),
            format!("How many times we received unsuccessful or no response to {rpc}"),
        ));
        pairs.push((
            format!("{rpc}Success"),
            format!("How many times we received successful response to {rpc}"),
        ));
    }
    pairs
}

fn push_pairs(
    descriptors: &mut Vec<MetricDescriptor>,
    pairs: impl IntoIterator<Item = (String, String)>,
    group: MetricGroup,
    kind: MetricKind,
    labeled: bool,
) {
    descriptors.extend(pairs.into_iter().map(|(name, description)| MetricDescriptor {
        name,
        description,
        group,
        kind,
        labeled,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_metric_name_matches_dashboard_convention() {
        assert_eq!(latency_metric_name("AppendDeltasRpc", 50), "AppendDeltasRpc_us_50p");
        assert_eq!(latency_metric_name("StateCheckRpc", 99), "StateCheckRpc_us_99p");
    }

    #[test]
    fn test_latency_triplet_covers_all_percentiles_in_order() {
        let names: Vec<String> = latency_triplet("HeartbeatRpc")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec!["HeartbeatRpc_us_50p", "HeartbeatRpc_us_90p", "HeartbeatRpc_us_99p"]
        );
    }

    #[test]
    fn test_latency_triplet_description_mentions_percentile() {
        let triplet = latency_triplet("SnapshotRpc");
        assert_eq!(
            triplet[2].1,
            "SnapshotRpc latency in microseconds, 99th percentile"
        );
    }

    #[test]
    fn test_category_payload_keys_are_exact() {
        assert_eq!(Category::Ttl.as_str(), "TTL");
        assert_eq!(Category::QueryType.as_str(), "QueryType");
        assert_eq!(Category::HighAvailability.to_string(), "HighAvailability");
    }

    #[test]
    fn test_base_categories_exclude_high_availability() {
        assert_eq!(Category::BASE.len(), 11);
        assert!(!Category::BASE.contains(&Category::HighAvailability));
    }

    #[test]
    fn test_standalone_catalog_is_unlabeled_gauges_only() {
        let catalog = Catalog::standalone().expect("static tables are unique");
        assert!(!catalog.is_empty());
        assert!(catalog.iter().all(|d| !d.labeled && d.kind == MetricKind::Gauge));
        assert!(catalog.iter().all(|d| d.group.category() != Category::HighAvailability));
    }

    #[test]
    fn test_ha_catalog_labels_everything_but_aggregates() {
        let catalog = Catalog::high_availability().expect("static tables are unique");
        for descriptor in catalog.iter() {
            let aggregate = descriptor.group == MetricGroup::HaCoordinatorAggregate;
            assert_eq!(descriptor.labeled, !aggregate, "{}", descriptor.name);
            assert_eq!(
                descriptor.kind == MetricKind::Counter,
                aggregate,
                "{}",
                descriptor.name
            );
        }
    }

    #[test]
    fn test_ha_catalog_is_standalone_plus_ha_groups() {
        let standalone = Catalog::standalone().expect("unique");
        let ha = Catalog::high_availability().expect("unique");
        let ha_only = ha
            .iter()
            .filter(|d| d.group.category() == Category::HighAvailability)
            .count();
        assert_eq!(ha.len(), standalone.len() + ha_only);
        assert_eq!(ha.group(MetricGroup::HaDataInstance).count(), 8 * 3);
        assert_eq!(ha.group(MetricGroup::HaCoordinator).count(), 11 * 3);
        assert_eq!(ha.group(MetricGroup::HaCoordinatorAggregate).count(), 10 + 8 * 2);
    }

    #[test]
    fn test_operator_description_is_generated() {
        let catalog = Catalog::standalone().expect("unique");
        let op = catalog.get("ScanAllOperator").expect("operator present");
        assert_eq!(op.group, MetricGroup::Base(Category::Operator));
        assert_eq!(op.description, "Number of times ScanAllOperator has been called.");
    }

    #[test]
    fn test_general_carries_socket_connect_latencies() {
        let catalog = Catalog::standalone().expect("unique");
        let socket = catalog.get("SocketConnect_us_90p").expect("timer present");
        assert_eq!(socket.group, MetricGroup::Base(Category::General));
    }

    #[test]
    fn test_aggregate_counters_include_rpc_outcomes() {
        let catalog = Catalog::high_availability().expect("unique");
        for name in ["SwapMainUUIDRpcFail", "SwapMainUUIDRpcSuccess", "BecomeLeaderSuccess"] {
            let d = catalog.get(name).expect("aggregate present");
            assert_eq!(d.group, MetricGroup::HaCoordinatorAggregate);
            assert!(d.label_names().is_empty());
        }
    }

    #[test]
    fn test_exposed_name_suffixes_counters_only() {
        let catalog = Catalog::high_availability().expect("unique");
        let counter = catalog.get("BecomeLeaderSuccess").expect("aggregate present");
        assert_eq!(counter.exposed_name(), "BecomeLeaderSuccess_total");
        let gauge = catalog.get("vertex_count").expect("present");
        assert_eq!(gauge.exposed_name(), "vertex_count");
    }

    #[test]
    fn test_label_names_follow_labeled_flag() {
        let catalog = Catalog::high_availability().expect("unique");
        let d = catalog.get("vertex_count").expect("present");
        assert_eq!(d.label_names(), &[INSTANCE_LABEL]);
    }

    #[test]
    fn test_duplicate_names_fail_fast() {
        let make = |group| MetricDescriptor {
            name: "vertex_count".into(),
            description: "dup".into(),
            group,
            kind: MetricKind::Gauge,
            labeled: false,
        };
        let err = Catalog::from_descriptors(
            Topology::Standalone,
            vec![
                make(MetricGroup::Base(Category::General)),
                make(MetricGroup::Base(Category::Index)),
            ],
        )
        .expect_err("duplicate must be rejected");
        assert_eq!(
            err,
            CatalogError::DuplicateMetric {
                name: "vertex_count".into(),
                first: MetricGroup::Base(Category::General),
                second: MetricGroup::Base(Category::Index),
            }
        );
    }

    #[test]
    fn test_topology_serde_uses_cli_spelling() {
        let ha: Topology = serde_json::from_str("\"HA\"").expect("parse");
        assert_eq!(ha, Topology::HighAvailability);
        let standalone: Topology = serde_json::from_str("\"standalone\"").expect("parse");
        assert_eq!(standalone, Topology::Standalone);
        assert!(serde_json::from_str::<Topology>("\"cluster\"").is_err());
    }
}
