//! # memgraph-exporter
//!
//! Polls Memgraph statistics endpoints and serves them as Prometheus metrics.
//!
//! ## Usage
//!
//! ```bash
//! # Standalone deployment described in config.toml
//! memgraph-exporter
//!
//! # HA cluster, overriding the deployment written in the file
//! memgraph-exporter --config ha.toml --type HA
//!
//! # Print the JSON Schema of the config file
//! memgraph-exporter --schema
//! ```
//!
//! ## Environment Variables
//!
//! - `LOG_FORMAT=json`: structured JSON output
//! - `RUST_LOG=info`: log level filter (default: info)

use std::path::PathBuf;

use memgraph_exporter::config::{self, loader};
use memgraph_exporter::{
    build_registry, init_tracing, metrics_server, PollerConfig, StatsPoller, Topology,
    UpdateEngine,
};
use tokio::sync::watch;
use tracing::{error, info};

/// Parsed CLI arguments.
struct Args {
    /// Path to the TOML config file.
    config: PathBuf,
    /// Deployment override.
    deployment: Option<Topology>,
    /// Print the config JSON Schema and exit.
    schema: bool,
}

/// Parse command-line arguments manually (no external arg parser dependency).
fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = PathBuf::from("config.toml");
    let mut deployment = None;
    let mut schema = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a value".to_string());
                }
                config = PathBuf::from(&args[i]);
            }
            "--type" | "-t" => {
                i += 1;
                if i >= args.len() {
                    return Err("--type requires a value".to_string());
                }
                deployment = Some(parse_topology(&args[i])?);
            }
            "--schema" => {
                schema = true;
            }
            "--help" | "-h" => {
                return Err(usage());
            }
            other => {
                return Err(format!("unknown argument: {other}\n{}", usage()));
            }
        }
        i += 1;
    }

    Ok(Args {
        config,
        deployment,
        schema,
    })
}

fn parse_topology(value: &str) -> Result<Topology, String> {
    match value {
        "standalone" => Ok(Topology::Standalone),
        "HA" | "ha" | "high_availability" => Ok(Topology::HighAvailability),
        other => Err(format!(
            "invalid deployment type: {other} (expected standalone or HA)"
        )),
    }
}

/// Print usage information.
fn usage() -> String {
    [
        "Usage: memgraph-exporter [OPTIONS]",
        "",
        "Options:",
        "  --config, -c <FILE>   Path to config TOML file (default: config.toml)",
        "  --type, -t <TYPE>     Deployment type: standalone or HA (overrides the file)",
        "  --schema              Print the config JSON Schema and exit",
        "  --help, -h            Show this help message",
    ]
    .join("\n")
}

#[tokio::main]
async fn main() {
    let _ = init_tracing();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(1);
        }
    };

    if args.schema {
        match config::export_schema() {
            Ok(schema) => println!("{schema}"),
            Err(e) => {
                eprintln!("schema export failed: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match loader::load_with_deployment(&args.config, args.deployment) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let topology = config.exporter.deployment;
    let registry = match build_registry(topology) {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, "Failed to build metric registry");
            std::process::exit(1);
        }
    };

    info!(
        %topology,
        instances = config.instances.len(),
        metrics = registry.len(),
        "Starting memgraph-exporter"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut server = tokio::spawn(metrics_server::start_server(
        config.listen_addr(),
        registry.clone(),
        shutdown_rx.clone(),
    ));

    let poller = StatsPoller::new(
        PollerConfig {
            poll_interval: config.poll_interval(),
            request_timeout: config.request_timeout(),
            ..PollerConfig::default()
        },
        config.instances(),
        UpdateEngine::new(registry),
    );
    let poll_task = tokio::spawn(poller.run(shutdown_rx));

    let mut exit_code = 0;
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Metrics server failed"),
                Err(e) => error!(error = %e, "Metrics server task failed"),
            }
        }
        finished = &mut server => {
            match finished {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Metrics server failed"),
                Err(e) => error!(error = %e, "Metrics server task failed"),
            }
            exit_code = 1;
            let _ = shutdown_tx.send(true);
        }
    }

    if let Err(e) = poll_task.await {
        error!(error = %e, "Poller task failed");
    }

    info!("memgraph-exporter stopped");
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
