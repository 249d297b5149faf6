//! Count results and the per-cycle aggregate.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::kind::Kind;

/// Count and age of objects of one kind, in one cluster and namespace scope,
/// matching one label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountResult {
    pub cluster: String,
    /// Namespace scope; empty means all namespaces.
    pub namespace: String,
    pub kind: Kind,
    pub label_selector: String,
    pub count: usize,
    pub newest: Option<DateTime<Utc>>,
    pub oldest: Option<DateTime<Utc>>,
}

/// A counting task that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountFailure {
    pub cluster: String,
    pub namespace: String,
    pub kind: Kind,
    pub label_selector: String,
    pub error: String,
}

/// Results of one dispatch round. Failures are kept apart and never rendered.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub results: Vec<CountResult>,
    pub failures: Vec<CountFailure>,
}

impl Aggregate {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of task outcomes collected, successful or not.
    pub fn outcomes(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// Sum of counts across all results.
    pub fn total(&self) -> usize {
        self.results.iter().map(|r| r.count).sum()
    }

    /// Sort by count (descending), then kind, cluster and namespace (ascending).
    /// The sort is stable, so remaining ties keep their collection order.
    pub fn sort(&mut self) {
        self.results.sort_by(compare_results);
    }
}

fn compare_results(a: &CountResult, b: &CountResult) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
        .then_with(|| a.cluster.cmp(&b.cluster))
        .then_with(|| a.namespace.cmp(&b.namespace))
}
