//! Counting objects of one kind in one cluster.

use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::debug;

use crate::error::KcountError;
use crate::k8s::ClusterContext;
use crate::kind::Kind;
use crate::types::CountResult;

/// Default bound for a single list call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Count objects of `kind` in the cluster's namespace scope that match
/// `label_selector`, with a single list call bounded by `timeout`.
pub async fn count_objects(
    cluster: &ClusterContext,
    kind: Kind,
    label_selector: &str,
    timeout: Duration,
) -> Result<CountResult, KcountError> {
    let list = cluster
        .lister()
        .list(kind, cluster.namespace(), label_selector, timeout);

    let items = tokio::time::timeout(timeout, list).await.map_err(|_| {
        KcountError::Connection(format!(
            "Failed to list {} objects: timed out after {}s",
            kind,
            timeout.as_secs_f64()
        ))
    })??;

    let (count, newest, oldest) = summarize(&items);
    debug!(
        cluster = cluster.name(),
        kind = %kind,
        count,
        "Counted objects"
    );

    Ok(CountResult {
        cluster: cluster.name().to_string(),
        namespace: cluster.namespace().unwrap_or_default().to_string(),
        kind,
        label_selector: label_selector.to_string(),
        count,
        newest,
        oldest,
    })
}

/// Reduce listed objects to (count, newest, oldest) in a single pass.
///
/// The first timestamped object seeds both bounds. On ties the first-seen
/// object stays oldest. Objects without a creation timestamp are counted
/// but ignored for age.
pub fn summarize(items: &[ObjectMeta]) -> (usize, Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let mut newest: Option<DateTime<Utc>> = None;
    let mut oldest: Option<DateTime<Utc>> = None;

    for ts in items
        .iter()
        .filter_map(|meta| meta.creation_timestamp.as_ref().map(|t| t.0))
    {
        match (newest, oldest) {
            (Some(n), Some(o)) => {
                if ts > n {
                    newest = Some(ts);
                }
                if ts < o {
                    oldest = Some(ts);
                }
            }
            _ => {
                newest = Some(ts);
                oldest = Some(ts);
            }
        }
    }

    (items.len(), newest, oldest)
}
