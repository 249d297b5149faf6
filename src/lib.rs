//! kcount - count Kubernetes objects across clusters.
//!
//! Fans one list call out per (cluster, kind) pair, collects every outcome
//! without letting one failure block the others, and either prints a sorted
//! table or keeps Prometheus gauges up to date.

pub mod config;
pub mod counter;
pub mod daemon;
pub mod dispatcher;
pub mod error;
pub mod k8s;
pub mod kind;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod types;

pub use counter::count_objects;
pub use dispatcher::count_across_clusters;
pub use error::KcountError;
pub use k8s::{ClusterContext, ObjectLister};
pub use kind::Kind;
pub use types::{Aggregate, CountFailure, CountResult};
