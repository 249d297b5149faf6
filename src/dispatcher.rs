//! Concurrent counting across every (cluster, kind) pair.
//!
//! One task is spawned per pair and every task reports exactly one outcome
//! into a shared channel. The coordinator drains all outcomes before
//! returning, so a slow or failing cluster never cuts a round short and a
//! failure never aborts its siblings.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::counter::count_objects;
use crate::error::KcountError;
use crate::k8s::ClusterContext;
use crate::kind::Kind;
use crate::types::{Aggregate, CountFailure, CountResult};

/// Error recorded for a pair whose task ended without reporting.
const NO_OUTCOME: &str = "counting task exited without reporting an outcome";

/// One (cluster, kind) pair handed to a counting task.
struct Pair {
    cluster: String,
    namespace: String,
    kind: Kind,
}

/// Outcome reported by one counting task, keyed by its pair index.
struct Outcome {
    pair: usize,
    result: Result<CountResult, KcountError>,
}

/// Count `kinds` across `clusters` concurrently and collect every outcome.
///
/// Failed tasks are logged and recorded in [`Aggregate::failures`]; they are
/// never returned as an error. A task that dies without reporting (a panic)
/// is recorded as a failure too, so every pair yields exactly one outcome.
/// The returned results are in completion order.
pub async fn count_across_clusters(
    clusters: &[ClusterContext],
    kinds: &[Kind],
    label_selector: &str,
    timeout: Duration,
) -> Aggregate {
    let expected = clusters.len() * kinds.len();
    let (tx, mut rx) = mpsc::channel::<Outcome>(expected.max(1));

    let mut pairs = Vec::with_capacity(expected);

    for cluster in clusters {
        for &kind in kinds {
            let pair = pairs.len();
            pairs.push(Pair {
                cluster: cluster.name().to_string(),
                namespace: cluster.namespace().unwrap_or_default().to_string(),
                kind,
            });

            let tx = tx.clone();
            let cluster = cluster.clone();
            let label_selector = label_selector.to_string();

            tokio::spawn(async move {
                let result = count_objects(&cluster, kind, &label_selector, timeout).await;
                // Receiver outlives all tasks unless the round was abandoned
                let _ = tx.send(Outcome { pair, result }).await;
            });
        }
    }

    // Only task-held senders remain, so the drain ends even if a task dies
    drop(tx);

    let mut aggregate = Aggregate::default();
    let mut reported = vec![false; expected];
    let mut received = 0;

    while received < expected {
        let Some(outcome) = rx.recv().await else {
            break;
        };
        received += 1;
        reported[outcome.pair] = true;

        match outcome.result {
            Ok(result) => aggregate.results.push(result),
            Err(e) => record_failure(&mut aggregate, &pairs[outcome.pair], label_selector, &e),
        }
    }

    if received < expected {
        error!(
            expected,
            received, "Counting tasks exited without reporting an outcome"
        );
        for (pair, _) in pairs.iter().zip(&reported).filter(|(_, done)| !**done) {
            record_failure(&mut aggregate, pair, label_selector, &NO_OUTCOME);
        }
    }

    debug!(
        expected,
        succeeded = aggregate.results.len(),
        failed = aggregate.failures.len(),
        "Dispatch round complete"
    );

    aggregate
}

fn record_failure(
    aggregate: &mut Aggregate,
    pair: &Pair,
    label_selector: &str,
    error: &dyn std::fmt::Display,
) {
    warn!(
        cluster = %pair.cluster,
        namespace = %pair.namespace,
        kind = %pair.kind,
        error = %error,
        "Counting objects failed"
    );
    aggregate.failures.push(CountFailure {
        cluster: pair.cluster.clone(),
        namespace: pair.namespace.clone(),
        kind: pair.kind,
        label_selector: label_selector.to_string(),
        error: error.to_string(),
    });
}
