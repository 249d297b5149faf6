//! Daemon mode: recount on a fixed interval and keep metrics current.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::dispatcher::count_across_clusters;
use crate::k8s::ClusterContext;
use crate::kind::Kind;
use crate::metrics::Metrics;
use crate::types::Aggregate;

/// Default pause between refresh cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// What to count on every refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub kinds: Vec<Kind>,
    pub label_selector: String,
    pub timeout: Duration,
    pub interval: Duration,
    pub track_age: bool,
}

/// Run one full counting round and publish it to the metrics.
pub async fn refresh_once(
    clusters: &[ClusterContext],
    settings: &RefreshSettings,
    metrics: &Metrics,
) -> Aggregate {
    let started = Instant::now();
    let aggregate = count_across_clusters(
        clusters,
        &settings.kinds,
        &settings.label_selector,
        settings.timeout,
    )
    .await;

    metrics.record(&aggregate, settings.track_age);
    metrics.observe_refresh(started.elapsed());

    debug!(
        results = aggregate.results.len(),
        failures = aggregate.failures.len(),
        elapsed_ms = millis(started.elapsed()),
        "Refresh cycle complete"
    );

    aggregate
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Refresh forever. A cycle starts only after the previous one has been
/// fully collected and published.
pub async fn run(clusters: Vec<ClusterContext>, settings: RefreshSettings, metrics: Arc<Metrics>) {
    info!(
        clusters = clusters.len(),
        kinds = settings.kinds.len(),
        interval_secs = settings.interval.as_secs_f64(),
        "Starting refresh loop"
    );

    loop {
        refresh_once(&clusters, &settings, &metrics).await;
        tokio::time::sleep(settings.interval).await;
    }
}
