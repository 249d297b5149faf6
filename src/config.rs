//! CLI configuration and argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::counter::DEFAULT_TIMEOUT;
use crate::daemon::{DEFAULT_INTERVAL, RefreshSettings};
use crate::kind::Kind;
use crate::metrics::DEFAULT_PORT;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Count Kubernetes objects across clusters.
///
/// Clusters come from the given kubeconfig files (or $KUBECONFIG), plus the
/// in-cluster service account when running inside a pod.
#[derive(Parser, Debug, Clone)]
#[command(name = "kcount")]
#[command(about = "Count Kubernetes objects across clusters")]
#[command(version = const_format::formatcp!(
    "{} (commit: {}, build date: {})",
    VERSION, COMMIT, BUILD_DATE
))]
#[command(after_help = r#"Supported kinds:
  deployment, pod, configmap, secret, ingress, service,
  statefulset, daemonset, job, cronjob

Examples:
  kcount -k pod,deployment ~/.kube/prod ~/.kube/staging
  kcount -A -l app=web -a
  kcount -d --port 2112"#)]
pub struct Args {
    /// Kubeconfig files, one per cluster [default: $KUBECONFIG entries]
    #[arg(value_name = "KUBECONFIG")]
    pub kubeconfigs: Vec<PathBuf>,

    /// Label selector (e.g. env=prod)
    #[arg(short = 'l', long = "selector", default_value = "")]
    pub label_selector: String,

    /// Object kinds to count, comma-separated or repeated
    #[arg(short, long = "kind", value_delimiter = ',', default_value = "pod")]
    pub kinds: Vec<Kind>,

    /// Also show age of the newest and oldest object
    #[arg(short, long, default_value = "false")]
    pub age: bool,

    /// Count across all namespaces
    #[arg(short = 'A', long, default_value = "false", conflicts_with = "namespace")]
    pub all_namespaces: bool,

    /// Namespace to count in, overriding the kubeconfig context namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Run as a daemon exposing Prometheus metrics
    #[arg(short, long, default_value = "false")]
    pub daemon: bool,

    /// Metrics server port (daemon mode)
    #[arg(long, env = "KCOUNT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds between refresh cycles (daemon mode)
    #[arg(long, env = "KCOUNT_INTERVAL", default_value_t = DEFAULT_INTERVAL.as_secs())]
    pub interval: u64,

    /// Timeout in seconds for each list call
    #[arg(long, env = "KCOUNT_TIMEOUT", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "KCOUNT_LOG_LEVEL")]
    pub log_level: String,

    /// Log format
    #[arg(long, value_enum, default_value = "text", env = "KCOUNT_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration derived from CLI args.
#[derive(Debug, Clone)]
pub struct Config {
    pub kubeconfigs: Vec<PathBuf>,
    pub label_selector: String,
    pub kinds: Vec<Kind>,
    pub show_age: bool,
    pub all_namespaces: bool,
    pub namespace: Option<String>,
    pub daemon: bool,
    pub metrics_port: u16,
    pub refresh_interval: Duration,
    pub timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Create config from CLI arguments, falling back to $KUBECONFIG when no
    /// kubeconfig files are given.
    pub fn from_args(args: Args) -> Self {
        let kubeconfigs = if args.kubeconfigs.is_empty() {
            split_kubeconfig_env(std::env::var("KUBECONFIG").ok().as_deref())
        } else {
            args.kubeconfigs
        };

        Self {
            kubeconfigs,
            label_selector: args.label_selector,
            kinds: dedup_kinds(args.kinds),
            show_age: args.age,
            all_namespaces: args.all_namespaces,
            namespace: args.namespace.filter(|ns| !ns.is_empty()),
            daemon: args.daemon,
            metrics_port: args.port,
            refresh_interval: Duration::from_secs(args.interval),
            timeout: Duration::from_secs(args.timeout),
            log_level: args.log_level,
            log_format: args.log_format,
        }
    }

    /// Validate settings that clap cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.kinds.is_empty() {
            return Err("at least one kind is required".to_string());
        }
        if self.timeout.is_zero() {
            return Err("--timeout must be greater than 0".to_string());
        }
        if self.daemon && self.refresh_interval.is_zero() {
            return Err("--interval must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Settings for the daemon refresh loop.
    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            kinds: self.kinds.clone(),
            label_selector: self.label_selector.clone(),
            timeout: self.timeout,
            interval: self.refresh_interval,
            track_age: self.show_age,
        }
    }
}

/// Split a KUBECONFIG value into paths, dropping empty entries.
fn split_kubeconfig_env(value: Option<&str>) -> Vec<PathBuf> {
    value
        .map(|v| {
            std::env::split_paths(v)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Drop repeated kinds, keeping first occurrence order.
fn dedup_kinds(kinds: Vec<Kind>) -> Vec<Kind> {
    let mut unique = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !unique.contains(&kind) {
            unique.push(kind);
        }
    }
    unique
}
