//! Cluster resolution from kubeconfig files and in-cluster credentials.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::{debug, info};

use super::lister::{KubeLister, ObjectLister};
use crate::error::KcountError;

/// Cluster name reported for the in-cluster service account config.
pub const IN_CLUSTER_NAME: &str = "in-cluster";

/// A reachable cluster bound to a namespace scope.
///
/// Immutable once built; cheap to clone since the connection is shared.
#[derive(Clone)]
pub struct ClusterContext {
    name: String,
    namespace: Option<String>,
    lister: Arc<dyn ObjectLister>,
}

impl ClusterContext {
    pub fn new(
        name: impl Into<String>,
        namespace: Option<String>,
        lister: Arc<dyn ObjectLister>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace,
            lister,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace scope; `None` means all namespaces.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn lister(&self) -> &dyn ObjectLister {
        self.lister.as_ref()
    }

    /// Return a copy of this context rebound to another namespace scope.
    pub fn with_namespace(self, namespace: Option<String>) -> Self {
        Self { namespace, ..self }
    }
}

impl std::fmt::Debug for ClusterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterContext")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Resolve cluster contexts from kubeconfig files, then from in-cluster
/// credentials when running inside a pod.
///
/// `all_namespaces` widens every context to all namespaces; otherwise a
/// non-empty `namespace` overrides each context's own namespace. Returning
/// zero contexts is not an error here.
pub async fn resolve_clusters(
    kubeconfigs: &[PathBuf],
    all_namespaces: bool,
    namespace: Option<&str>,
) -> Result<Vec<ClusterContext>, KcountError> {
    let mut clusters = Vec::with_capacity(kubeconfigs.len() + 1);

    for path in kubeconfigs {
        clusters.push(from_kubeconfig(path).await?);
    }

    if let Some(cluster) = from_in_cluster()? {
        clusters.push(cluster);
    }

    let clusters = apply_namespace_scope(clusters, all_namespaces, namespace);
    info!(clusters = clusters.len(), "Resolved cluster contexts");

    Ok(clusters)
}

/// Rebind every context to the namespace scope requested on the command line.
pub fn apply_namespace_scope(
    clusters: Vec<ClusterContext>,
    all_namespaces: bool,
    namespace: Option<&str>,
) -> Vec<ClusterContext> {
    if all_namespaces {
        return clusters
            .into_iter()
            .map(|c| c.with_namespace(None))
            .collect();
    }

    match namespace.filter(|ns| !ns.is_empty()) {
        Some(ns) => clusters
            .into_iter()
            .map(|c| c.with_namespace(Some(ns.to_string())))
            .collect(),
        None => clusters,
    }
}

/// Build a cluster context from the current context of a kubeconfig file.
async fn from_kubeconfig(path: &Path) -> Result<ClusterContext, KcountError> {
    debug!("Loading kubeconfig: {}", path.display());

    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        KcountError::Resolution(format!("reading kubeconfig {}: {}", path.display(), e))
    })?;

    let cluster_name =
        current_cluster_name(&kubeconfig).unwrap_or_else(|| path.display().to_string());

    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| KcountError::Resolution(format!("kubeconfig {}: {}", path.display(), e)))?;

    // kube falls back to "default" when the context has no namespace
    let namespace = config.default_namespace.clone();

    let client = kube::Client::try_from(config)
        .map_err(|e| KcountError::Resolution(format!("kubeconfig {}: {}", path.display(), e)))?;

    debug!(cluster = %cluster_name, namespace = %namespace, "Loaded cluster from kubeconfig");

    Ok(ClusterContext::new(
        cluster_name,
        Some(namespace),
        Arc::new(KubeLister::new(client)),
    ))
}

/// Build a cluster context from the pod's service account.
///
/// Returns `Ok(None)` when not running inside a cluster.
fn from_in_cluster() -> Result<Option<ClusterContext>, KcountError> {
    if !in_cluster_env(
        std::env::var_os("KUBERNETES_SERVICE_HOST"),
        std::env::var_os("KUBERNETES_SERVICE_PORT"),
    ) {
        debug!("Not running inside a cluster, skipping in-cluster config");
        return Ok(None);
    }

    let config = kube::Config::incluster()
        .map_err(|e| KcountError::Resolution(format!("in-cluster config: {}", e)))?;
    let namespace = config.default_namespace.clone();
    let client = kube::Client::try_from(config)
        .map_err(|e| KcountError::Resolution(format!("in-cluster config: {}", e)))?;

    debug!(namespace = %namespace, "Loaded in-cluster config");

    Ok(Some(ClusterContext::new(
        IN_CLUSTER_NAME,
        Some(namespace),
        Arc::new(KubeLister::new(client)),
    )))
}

/// Both service variables must be set and non-empty to use in-cluster config.
fn in_cluster_env(host: Option<OsString>, port: Option<OsString>) -> bool {
    [host, port]
        .iter()
        .all(|v| v.as_ref().is_some_and(|v| !v.is_empty()))
}

/// Name of the cluster referenced by the kubeconfig's current context.
fn current_cluster_name(kubeconfig: &Kubeconfig) -> Option<String> {
    let current = kubeconfig.current_context.as_deref()?;
    kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == current)
        .and_then(|c| c.context.as_ref())
        .map(|c| c.cluster.clone())
        .filter(|name| !name.is_empty())
}
