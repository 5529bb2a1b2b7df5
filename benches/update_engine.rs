//! Update engine benchmarks: cost of routing one payload into the registry.
//!
//! One poll round per instance does exactly one `update` call, so these numbers
//! bound the CPU spent per tick.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use memgraph_exporter::{
    build_registry, Instance, InstanceRole, StatsPayload, Topology, UpdateEngine,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn data_payload() -> StatsPayload {
    let value = json!({
        "General": {"vertex_count": 1000, "edge_count": 5000, "memory_usage": 1_048_576},
        "Index": {"ActiveLabelIndices": 3},
        "Operator": {"ScanAllOperator": 12, "ExpandOperator": 40},
        "Query": {"QueryExecutionLatency_us_50p": 120, "QueryExecutionLatency_us_99p": 900},
        "QueryType": {"ReadQuery": 77},
        "Session": {"ActiveSessions": 4},
        "Snapshot": {},
        "Stream": {},
        "Transaction": {"ActiveTransactions": 2},
        "Trigger": {},
        "TTL": {},
        "HighAvailability": {"AppendDeltasRpc_us_50p": 30, "HeartbeatRpc_us_99p": 80}
    });
    serde_json::from_value(value).expect("bench payload")
}

fn coordinator_payload() -> StatsPayload {
    let value = json!({
        "General": {"memory_usage": 2048},
        "HighAvailability": {
            "StateCheckRpc_us_50p": 10,
            "StateCheckRpcSuccess": 1,
            "BecomeLeaderSuccess": 0
        }
    });
    serde_json::from_value(value).expect("bench payload")
}

// ---------------------------------------------------------------------------
// Benches
// ---------------------------------------------------------------------------

fn bench_data_instance_update(c: &mut Criterion) {
    let engine = UpdateEngine::new(build_registry(Topology::HighAvailability).expect("registry"));
    let payload = data_payload();
    let instance = Instance::new("data_1", "http://localhost", 9091, InstanceRole::DataInstance);

    c.bench_function("update_data_instance", |b| {
        b.iter(|| engine.update(black_box(&payload), black_box(&instance)))
    });
}

fn bench_coordinator_update(c: &mut Criterion) {
    let engine = UpdateEngine::new(build_registry(Topology::HighAvailability).expect("registry"));
    let payload = coordinator_payload();
    let instance = Instance::new("coord_1", "http://localhost", 9094, InstanceRole::Coordinator);

    c.bench_function("update_coordinator", |b| {
        b.iter(|| engine.update(black_box(&payload), black_box(&instance)))
    });
}

fn bench_gather_metrics(c: &mut Criterion) {
    let registry = build_registry(Topology::HighAvailability).expect("registry");
    let engine = UpdateEngine::new(registry.clone());
    let payload = data_payload();
    for name in ["data_1", "data_2", "data_3"] {
        let instance = Instance::new(name, "http://localhost", 9091, InstanceRole::DataInstance);
        engine.update(&payload, &instance);
    }

    c.bench_function("gather_metrics_three_instances", |b| {
        b.iter(|| black_box(registry.gather_metrics()))
    });
}

criterion_group!(
    benches,
    bench_data_instance_update,
    bench_coordinator_update,
    bench_gather_metrics
);
criterion_main!(benches);
