//! Kubernetes object kinds that can be counted.

use std::fmt;
use std::str::FromStr;

use crate::error::KcountError;

/// Resource kinds supported by the counter.
///
/// All of them are namespaced, so a cluster context's namespace scope
/// applies uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Deployment,
    Pod,
    ConfigMap,
    Secret,
    Ingress,
    Service,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
}

impl Kind {
    pub const ALL: &'static [Kind] = &[
        Kind::Deployment,
        Kind::Pod,
        Kind::ConfigMap,
        Kind::Secret,
        Kind::Ingress,
        Kind::Service,
        Kind::StatefulSet,
        Kind::DaemonSet,
        Kind::Job,
        Kind::CronJob,
    ];

    /// Canonical lowercase name, used for sorting, table output and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Deployment => "deployment",
            Kind::Pod => "pod",
            Kind::ConfigMap => "configmap",
            Kind::Secret => "secret",
            Kind::Ingress => "ingress",
            Kind::Service => "service",
            Kind::StatefulSet => "statefulset",
            Kind::DaemonSet => "daemonset",
            Kind::Job => "job",
            Kind::CronJob => "cronjob",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = KcountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "deployment" | "deployments" | "deploy" => Kind::Deployment,
            "pod" | "pods" | "po" => Kind::Pod,
            "configmap" | "configmaps" | "config-map" | "cm" => Kind::ConfigMap,
            "secret" | "secrets" => Kind::Secret,
            "ingress" | "ingresses" | "ing" => Kind::Ingress,
            "service" | "services" | "svc" => Kind::Service,
            "statefulset" | "statefulsets" | "sts" => Kind::StatefulSet,
            "daemonset" | "daemonsets" | "ds" => Kind::DaemonSet,
            "job" | "jobs" => Kind::Job,
            "cronjob" | "cronjobs" | "cj" => Kind::CronJob,
            _ => return Err(KcountError::UnsupportedKind(s.to_string())),
        };
        Ok(kind)
    }
}
