//! Kubernetes access: cluster resolution and object listing.

pub mod cluster;
pub mod lister;

pub use cluster::{ClusterContext, resolve_clusters};
pub use lister::{KubeLister, ObjectLister};
