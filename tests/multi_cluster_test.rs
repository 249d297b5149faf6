use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;

use kcount::daemon::{RefreshSettings, refresh_once};
use kcount::metrics::Metrics;
use kcount::output::table;
use kcount::{ClusterContext, Kind, KcountError, ObjectLister, count_across_clusters};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Serves a fixed object set per kind; kinds without an entry fail.
struct StaticLister {
    objects: HashMap<Kind, Vec<ObjectMeta>>,
}

#[async_trait]
impl ObjectLister for StaticLister {
    async fn list(
        &self,
        kind: Kind,
        _namespace: Option<&str>,
        _label_selector: &str,
        _timeout: Duration,
    ) -> Result<Vec<ObjectMeta>, KcountError> {
        self.objects
            .get(&kind)
            .cloned()
            .ok_or_else(|| KcountError::Connection(format!("the server could not find {}", kind)))
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn objects(n: usize, span: chrono::Duration) -> Vec<ObjectMeta> {
    (0..n)
        .map(|i| ObjectMeta {
            name: Some(format!("obj-{}", i)),
            creation_timestamp: Some(Time(start() + span * i as i32 / (n.max(2) - 1) as i32)),
            ..Default::default()
        })
        .collect()
}

fn cluster(name: &str, objects: Vec<(Kind, Vec<ObjectMeta>)>) -> ClusterContext {
    ClusterContext::new(
        name,
        Some("default".to_string()),
        Arc::new(StaticLister {
            objects: objects.into_iter().collect(),
        }),
    )
}

#[tokio::test]
async fn test_prod_and_staging_pods() {
    let clusters = vec![
        cluster("staging", vec![(Kind::Pod, vec![])]),
        cluster("prod", vec![(Kind::Pod, objects(10, chrono::Duration::days(3)))]),
    ];

    let mut aggregate = count_across_clusters(&clusters, &[Kind::Pod], "", TIMEOUT).await;
    aggregate.sort();

    assert_eq!(aggregate.results.len(), 2);
    assert_eq!(aggregate.results[0].cluster, "prod");
    assert_eq!(aggregate.results[0].count, 10);
    assert_eq!(aggregate.results[0].oldest, Some(start()));
    assert_eq!(
        aggregate.results[0].newest,
        Some(start() + chrono::Duration::days(3))
    );
    assert_eq!(aggregate.results[1].cluster, "staging");
    assert_eq!(aggregate.results[1].count, 0);
    assert_eq!(aggregate.results[1].newest, None);
    assert_eq!(aggregate.total(), 10);

    let now = start() + chrono::Duration::days(4);
    let rendered = table::render(&aggregate, true, now);
    let total = rendered.lines().last().unwrap().trim_end();
    assert!(total.starts_with("Total"));
    assert!(total.ends_with("10"));
    assert_eq!(rendered, table::render(&aggregate, true, now));
}

#[tokio::test]
async fn test_partial_failure_keeps_other_results() {
    let clusters = vec![
        cluster(
            "a",
            vec![
                (Kind::Pod, objects(3, chrono::Duration::hours(1))),
                (Kind::Deployment, objects(1, chrono::Duration::hours(1))),
            ],
        ),
        // No deployments entry: the deployment list call fails
        cluster("b", vec![(Kind::Pod, objects(2, chrono::Duration::hours(1)))]),
    ];
    let kinds = [Kind::Pod, Kind::Deployment];

    let mut aggregate = count_across_clusters(&clusters, &kinds, "app=web", TIMEOUT).await;
    aggregate.sort();

    assert_eq!(aggregate.outcomes(), clusters.len() * kinds.len());
    assert_eq!(aggregate.results.len(), 3);
    assert_eq!(aggregate.failures.len(), 1);
    assert_eq!(aggregate.failures[0].cluster, "b");
    assert_eq!(aggregate.failures[0].kind, Kind::Deployment);

    let order: Vec<(&str, Kind, usize)> = aggregate
        .results
        .iter()
        .map(|r| (r.cluster.as_str(), r.kind, r.count))
        .collect();
    assert_eq!(
        order,
        vec![
            ("a", Kind::Pod, 3),
            ("b", Kind::Pod, 2),
            ("a", Kind::Deployment, 1),
        ]
    );
    assert!(aggregate.results.iter().all(|r| r.label_selector == "app=web"));
}

#[tokio::test]
async fn test_daemon_cycles_publish_latest_counts() {
    let mut registry = Registry::default();
    let metrics = Metrics::new(&mut registry);
    let settings = RefreshSettings {
        kinds: vec![Kind::Pod],
        label_selector: String::new(),
        timeout: TIMEOUT,
        interval: Duration::from_secs(2),
        track_age: true,
    };

    let first = vec![cluster("prod", vec![(Kind::Pod, objects(3, chrono::Duration::hours(1)))])];
    refresh_once(&first, &settings, &metrics).await;

    let second = vec![cluster("prod", vec![(Kind::Pod, objects(7, chrono::Duration::hours(1)))])];
    refresh_once(&second, &settings, &metrics).await;

    let mut buf = String::new();
    encode(&mut buf, &registry).unwrap();

    let gauge = r#"kcount_objects{cluster="prod",namespace="default",labelSelector="",kind="pod"}"#;
    let line = buf.lines().find(|l| l.starts_with(gauge)).unwrap();
    assert_eq!(line, format!("{} 7", gauge));
    assert!(buf.contains(&format!(
        r#"kcount_objects_oldest_timestamp_seconds{{cluster="prod",namespace="default",labelSelector="",kind="pod"}} {}"#,
        start().timestamp()
    )));
}
