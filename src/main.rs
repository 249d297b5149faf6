//! kcount - count Kubernetes objects across clusters.
//!
//! Prints a table once, or runs as a daemon that keeps Prometheus gauges
//! up to date.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use tracing::{debug, error, info};

use kcount::config::{Args, Config};
use kcount::error::KcountError;
use kcount::metrics::Metrics;
use kcount::{count_across_clusters, daemon, k8s, logging, output};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = Config::from_args(args);

    logging::init(config.log_format, &config.log_level);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    debug!(
        version = kcount::config::VERSION,
        commit = kcount::config::COMMIT,
        "Starting kcount"
    );

    if let Err(e) = run(&config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(config: &Config) -> Result<()> {
    let clusters = k8s::resolve_clusters(
        &config.kubeconfigs,
        config.all_namespaces,
        config.namespace.as_deref(),
    )
    .await?;

    if clusters.is_empty() {
        return Err(KcountError::NoClusters.into());
    }

    if config.daemon {
        run_daemon(config, clusters).await
    } else {
        run_once(config, &clusters).await
    }
}

/// Count once, print a sorted table and exit.
async fn run_once(config: &Config, clusters: &[k8s::ClusterContext]) -> Result<()> {
    let mut aggregate = count_across_clusters(
        clusters,
        &config.kinds,
        &config.label_selector,
        config.timeout,
    )
    .await;

    aggregate.sort();
    output::table::print(&aggregate, config.show_age);

    Ok(())
}

/// Refresh counts forever while serving them as Prometheus metrics.
async fn run_daemon(config: &Config, clusters: Vec<k8s::ClusterContext>) -> Result<()> {
    let mut registry = Registry::default();
    let metrics = Arc::new(Metrics::new(&mut registry));
    let registry = Arc::new(registry);

    tokio::spawn(daemon::run(clusters, config.refresh_settings(), metrics));

    tokio::select! {
        result = kcount::metrics::serve(config.metrics_port, registry) => {
            result.context("metrics server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}
