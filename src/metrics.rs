//! Prometheus metrics for kcount's daemon mode.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use chrono::{DateTime, Utc};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::KcountError;
use crate::kind::Kind;
use crate::types::Aggregate;

/// Default port of the metrics endpoint.
pub const DEFAULT_PORT: u16 = 2112;

/// Path the metrics are served on.
pub const METRICS_PATH: &str = "/metrics";

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Label set identifying one counted object group.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
#[allow(non_snake_case)]
pub struct ObjectLabels {
    pub cluster: String,
    pub namespace: String,
    pub labelSelector: String,
    pub kind: String,
}

impl ObjectLabels {
    pub fn new(cluster: &str, namespace: &str, label_selector: &str, kind: Kind) -> Self {
        Self {
            cluster: cluster.to_string(),
            namespace: namespace.to_string(),
            labelSelector: label_selector.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Buckets for refresh cycle duration: one cycle is bounded by the list
/// timeout, 5s by default.
const REFRESH_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// All Prometheus metrics exposed by kcount.
pub struct Metrics {
    pub objects: Family<ObjectLabels, Gauge>,
    pub objects_newest: Family<ObjectLabels, Gauge>,
    pub objects_oldest: Family<ObjectLabels, Gauge>,
    pub list_errors_total: Family<ObjectLabels, Counter>,
    pub refresh_duration_seconds: Histogram,
}

impl Metrics {
    /// Create and register all metrics with the given registry.
    pub fn new(registry: &mut Registry) -> Self {
        let objects = Family::<ObjectLabels, Gauge>::default();
        registry.register(
            "kcount_objects",
            "Number of Kubernetes objects",
            objects.clone(),
        );

        let objects_newest = Family::<ObjectLabels, Gauge>::default();
        registry.register(
            "kcount_objects_newest_timestamp_seconds",
            "Creation time of the newest object as a Unix timestamp",
            objects_newest.clone(),
        );

        let objects_oldest = Family::<ObjectLabels, Gauge>::default();
        registry.register(
            "kcount_objects_oldest_timestamp_seconds",
            "Creation time of the oldest object as a Unix timestamp",
            objects_oldest.clone(),
        );

        let list_errors_total = Family::<ObjectLabels, Counter>::default();
        registry.register(
            "kcount_list_errors",
            "Total number of failed object list calls",
            list_errors_total.clone(),
        );

        let refresh_duration_seconds = Histogram::new(REFRESH_BUCKETS.iter().copied());
        registry.register(
            "kcount_refresh_duration_seconds",
            "Duration of a full counting round across all clusters in seconds",
            refresh_duration_seconds.clone(),
        );

        Self {
            objects,
            objects_newest,
            objects_oldest,
            list_errors_total,
            refresh_duration_seconds,
        }
    }

    /// Set gauges from one counting round.
    ///
    /// Each label set is overwritten; label sets missing from this round keep
    /// their last value.
    pub fn record(&self, aggregate: &Aggregate, track_age: bool) {
        for result in &aggregate.results {
            let labels = ObjectLabels::new(
                &result.cluster,
                &result.namespace,
                &result.label_selector,
                result.kind,
            );

            self.objects
                .get_or_create(&labels)
                .set(i64::try_from(result.count).unwrap_or(i64::MAX));

            if track_age {
                self.objects_newest
                    .get_or_create(&labels)
                    .set(unix_seconds(result.newest));
                self.objects_oldest
                    .get_or_create(&labels)
                    .set(unix_seconds(result.oldest));
            }
        }

        for failure in &aggregate.failures {
            self.list_errors_total
                .get_or_create(&ObjectLabels::new(
                    &failure.cluster,
                    &failure.namespace,
                    &failure.label_selector,
                    failure.kind,
                ))
                .inc();
        }
    }

    pub fn observe_refresh(&self, elapsed: Duration) {
        self.refresh_duration_seconds.observe(elapsed.as_secs_f64());
    }
}

/// Missing timestamps are exported as 0.
fn unix_seconds(ts: Option<DateTime<Utc>>) -> i64 {
    ts.map(|t| t.timestamp()).unwrap_or(0)
}

/// Axum handler that encodes the registry as OpenMetrics text.
async fn metrics_handler(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    let mut buf = String::new();
    if encode(&mut buf, &registry).is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Failed to encode metrics".to_string(),
        );
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)],
        buf,
    )
}

async fn healthz_handler() -> &'static str {
    "ok"
}

/// Router serving the metrics and a liveness endpoint.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(registry)
}

/// Start the metrics server on the given port.
pub async fn serve(port: u16, registry: Arc<Registry>) -> Result<(), KcountError> {
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .map_err(|e| KcountError::Metrics(format!("binding port {}: {}", port, e)))?;
    info!(port, path = METRICS_PATH, "Exposing Prometheus metrics");

    axum::serve(listener, router(registry))
        .await
        .map_err(|e| KcountError::Metrics(e.to_string()))
}
