//! Custom error types for kcount.

use thiserror::Error;

/// Errors that can occur while resolving clusters and counting objects.
#[derive(Error, Debug)]
pub enum KcountError {
    #[error("Kubernetes API error: {0}")]
    Connection(String),

    #[error("unsupported kind: {0}")]
    UnsupportedKind(String),

    #[error("getting cluster configs: {0}")]
    Resolution(String),

    #[error("no clusters found: run in cluster, set KUBECONFIG or supply at least one kubeconfig")]
    NoClusters,

    #[error("Metrics error: {0}")]
    Metrics(String),
}
