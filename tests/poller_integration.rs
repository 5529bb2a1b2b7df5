//! Integration tests for [`StatsPoller`] against a mock Memgraph stats
//! endpoint.
//!
//! These tests start a real Wiremock server that answers like a Memgraph
//! instance and verify that the poller:
//!
//! - Decodes the JSON body and routes it into the registry.
//! - Skips an instance that answers with a non-success status or bad JSON.
//! - Picks the instance up again on the next round.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use memgraph_exporter::poller::FetchError;
use memgraph_exporter::{
    build_registry, Instance, InstanceRole, PollerConfig, StatsPoller, Topology, UpdateEngine,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn instance_at(server: &MockServer, name: &str, role: InstanceRole) -> Instance {
    let addr = server.address();
    Instance::new(name, format!("http://{}", addr.ip()), addr.port(), role)
}

fn fast_config() -> PollerConfig {
    PollerConfig {
        poll_interval: Duration::from_millis(50),
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(2),
    }
}

async fn respond_json(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json"))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poll_once_routes_data_instance_payload() {
    let server = MockServer::start().await;
    respond_json(
        &server,
        r#"{"General": {"vertex_count": 42}, "Query": {"QueryExecutionLatency_us_50p": 120}}"#,
    )
    .await;

    let registry = build_registry(Topology::HighAvailability).expect("test: registry");
    let poller = StatsPoller::new(
        fast_config(),
        vec![instance_at(&server, "data0", InstanceRole::DataInstance)],
        UpdateEngine::new(registry.clone()),
    );

    let reports = poller.poll_once().await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "data0");
    assert_eq!(registry.value("vertex_count", Some("data0")), Some(42.0));
    assert_eq!(
        registry.value("QueryExecutionLatency_us_50p", Some("data0")),
        Some(120.0)
    );
}

#[tokio::test]
async fn poll_once_standalone_writes_unlabeled() {
    let server = MockServer::start().await;
    respond_json(&server, r#"{"General": {"edge_count": 9}}"#).await;

    let registry = build_registry(Topology::Standalone).expect("test: registry");
    let poller = StatsPoller::new(
        fast_config(),
        vec![instance_at(&server, "memgraph", InstanceRole::DataInstance)],
        UpdateEngine::new(registry.clone()),
    );

    poller.poll_once().await;

    assert_eq!(registry.value("edge_count", None), Some(9.0));
}

#[tokio::test]
async fn server_error_is_skipped_and_others_still_polled() {
    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&failing)
        .await;

    let healthy = MockServer::start().await;
    respond_json(
        &healthy,
        r#"{"General": {}, "HighAvailability": {"BecomeLeaderSuccess": 1}}"#,
    )
    .await;

    let registry = build_registry(Topology::HighAvailability).expect("test: registry");
    let poller = StatsPoller::new(
        fast_config(),
        vec![
            instance_at(&failing, "data0", InstanceRole::DataInstance),
            instance_at(&healthy, "coord1", InstanceRole::Coordinator),
        ],
        UpdateEngine::new(registry.clone()),
    );

    let reports = poller.poll_once().await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "coord1");
    assert_eq!(registry.value("BecomeLeaderSuccess", None), Some(1.0));
    assert!(registry.samples_for_instance("data0").is_empty());
}

#[tokio::test]
async fn fetch_reports_status_and_decode_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let registry = build_registry(Topology::HighAvailability).expect("test: registry");
    let instance = instance_at(&server, "data0", InstanceRole::DataInstance);
    let poller = StatsPoller::new(fast_config(), vec![], UpdateEngine::new(registry.clone()));

    let err = poller.fetch(&instance).await.expect_err("test: 503 must fail");
    assert!(matches!(err, FetchError::Status { status: 503, .. }), "{err}");

    let garbled = MockServer::start().await;
    respond_json(&garbled, "this is not json").await;
    let instance = instance_at(&garbled, "data0", InstanceRole::DataInstance);
    let err = poller.fetch(&instance).await.expect_err("test: bad body must fail");
    assert!(matches!(err, FetchError::Decode { .. }), "{err}");
}

#[tokio::test]
async fn run_loop_survives_failure_and_stops_on_shutdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    respond_json(&server, r#"{"General": {"vertex_count": 7}}"#).await;

    let registry = build_registry(Topology::HighAvailability).expect("test: registry");
    let poller = StatsPoller::new(
        fast_config(),
        vec![instance_at(&server, "data0", InstanceRole::DataInstance)],
        UpdateEngine::new(registry.clone()),
    );

    let (tx, rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(poller.run(rx));

    let mut seen = None;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        seen = registry.value("vertex_count", Some("data0"));
        if seen.is_some() {
            break;
        }
    }
    assert_eq!(seen, Some(7.0), "second round must succeed after the 500");

    tx.send(true).expect("test: send shutdown");
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("test: poller stops")
        .expect("test: join");
}
