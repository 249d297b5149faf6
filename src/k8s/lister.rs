//! Object listing against the Kubernetes API.
//!
//! Only object metadata is fetched: counting needs nothing beyond the
//! creation timestamp, so `list_metadata` keeps responses small even for
//! secrets and config maps.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::KcountError;
use crate::kind::Kind;

/// Lists object metadata of one kind within a namespace scope.
///
/// `namespace` of `None` lists across all namespaces. An empty
/// `label_selector` matches every object.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
        label_selector: &str,
        timeout: Duration,
    ) -> Result<Vec<ObjectMeta>, KcountError>;
}

/// `ObjectLister` backed by a kube client for one cluster.
#[derive(Clone)]
pub struct KubeLister {
    client: Client,
}

impl KubeLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectLister for KubeLister {
    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
        label_selector: &str,
        timeout: Duration,
    ) -> Result<Vec<ObjectMeta>, KcountError> {
        let params = list_params(label_selector, timeout);

        let items = match kind {
            Kind::Deployment => list_meta::<Deployment>(&self.client, namespace, &params).await,
            Kind::Pod => list_meta::<Pod>(&self.client, namespace, &params).await,
            Kind::ConfigMap => list_meta::<ConfigMap>(&self.client, namespace, &params).await,
            Kind::Secret => list_meta::<Secret>(&self.client, namespace, &params).await,
            Kind::Ingress => list_meta::<Ingress>(&self.client, namespace, &params).await,
            Kind::Service => list_meta::<Service>(&self.client, namespace, &params).await,
            Kind::StatefulSet => list_meta::<StatefulSet>(&self.client, namespace, &params).await,
            Kind::DaemonSet => list_meta::<DaemonSet>(&self.client, namespace, &params).await,
            Kind::Job => list_meta::<Job>(&self.client, namespace, &params).await,
            Kind::CronJob => list_meta::<CronJob>(&self.client, namespace, &params).await,
        }
        .map_err(|e| KcountError::Connection(format!("Failed to list {} objects: {}", kind, e)))?;

        debug!(
            kind = %kind,
            namespace = namespace.unwrap_or("<all>"),
            count = items.len(),
            "Listed objects"
        );

        Ok(items)
    }
}

/// Build list parameters with a label selector and a server-side timeout.
fn list_params(label_selector: &str, timeout: Duration) -> ListParams {
    let timeout_secs = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX).max(1);
    let params = ListParams::default().timeout(timeout_secs);
    if label_selector.is_empty() {
        params
    } else {
        params.labels(label_selector)
    }
}

async fn list_meta<K>(
    client: &Client,
    namespace: Option<&str>,
    params: &ListParams,
) -> Result<Vec<ObjectMeta>, kube::Error>
where
    K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
    <K as Resource>::DynamicType: Default,
{
    let api: Api<K> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let list = api.list_metadata(params).await?;
    Ok(list.items.into_iter().map(|item| item.metadata).collect())
}
