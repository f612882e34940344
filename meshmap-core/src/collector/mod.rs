//! Data-source collectors.
//!
//! Each collector adapts one external source (inventory file, compose
//! project, cluster API, ...) into the shared [`Infrastructure`] model. The
//! pipeline runs them strictly in registration order, since later collectors
//! enrich servers created by earlier ones, then hands the finished model to
//! the merge pass.

use serde_yaml::Value;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::model::{Infrastructure, ServiceKind};

mod ansible;
mod compose;
mod kubernetes;
mod merge;
mod portainer;
mod proxmox;
mod registry;
mod systemd;
mod tailscale;

pub use ansible::AnsibleCollector;
pub use compose::{ComposeCollector, ComposeFile, ScanDir};
pub use kubernetes::KubernetesCollector;
pub use merge::merge;
pub use portainer::PortainerCollector;
pub use proxmox::ProxmoxCollector;
pub use registry::builtin;
pub use systemd::{SystemdCollector, SystemdServer};
pub use tailscale::TailscaleCollector;

// ============================================================================
// Collector contract
// ============================================================================

/// Filesystem or binary hint used by `meshmap init` to auto-detect sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectHint {
    /// A file expected in the working directory, e.g. `hosts.yml`.
    File(&'static str),
    /// An executable expected on PATH, e.g. `kubectl`.
    Binary(&'static str),
    None,
}

/// Static identity of a collector, for discovery and documentation.
#[derive(Clone, Copy, Debug)]
pub struct CollectorMetadata {
    /// Internal key, e.g. `ansible`.
    pub name: &'static str,
    /// Human-readable name, e.g. `Ansible Inventory`.
    pub display_name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// YAML key under `sources`, e.g. `ansible`.
    pub config_key: &'static str,
    pub detect_hint: DetectHint,
}

/// A config problem found during pre-flight validation, with a suggested fix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path, e.g. `sources.ansible.inventory`.
    pub field: String,
    pub message: String,
    pub suggestion: String,
}

/// An adapter from one external data source into the shared model.
pub trait Collector {
    /// Static identity. Pure and side-effect free.
    fn metadata(&self) -> CollectorMetadata;

    /// Whether this collector should run, judged from its own section of the
    /// raw `sources` tree. Never mutates and never fails; a missing section
    /// means disabled.
    fn enabled(&self, sources: &Value) -> bool;

    /// Decode this collector's config section into its typed schema. A
    /// missing or empty section is a no-op; a present but malformed section
    /// is a [`ConfigError`].
    fn configure(&mut self, section: Option<&Value>) -> Result<(), ConfigError>;

    /// Pre-flight checks. Reports every problem found, without collecting.
    fn validate(&self) -> Vec<ValidationIssue>;

    /// Gather data and mutate the shared model. Call at most once per
    /// instance.
    fn collect(&self, infra: &mut Infrastructure) -> Result<(), SourceError>;
}

// ============================================================================
// Errors
// ============================================================================

/// An unrecoverable problem while gathering from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{command}: {message}")]
    Command { command: String, message: String },
    #[error("{path}: {message}")]
    File { path: String, message: String },
    #[error("{api} API returned {status}: {body}")]
    Api {
        api: &'static str,
        status: u16,
        body: String,
    },
}

/// A failure wrapped with the display name of the collector that produced it.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("{collector}: {source}")]
    Configure {
        collector: String,
        #[source]
        source: ConfigError,
    },
    #[error("{collector}: {source}")]
    Collect {
        collector: String,
        #[source]
        source: SourceError,
    },
}

impl CollectorError {
    pub fn collector(&self) -> &str {
        match self {
            CollectorError::Configure { collector, .. } => collector,
            CollectorError::Collect { collector, .. } => collector,
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Per-collector result of a pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectorStatus {
    Skipped,
    Completed,
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct CollectorOutcome {
    pub name: String,
    pub status: CollectorStatus,
}

/// Run every enabled collector in registration order against a fresh model,
/// then merge. Fail-fast: the first error aborts the run; the outcomes
/// gathered so far are always returned so callers can report which sources
/// had already succeeded.
pub fn collect(cfg: &Config) -> (Vec<CollectorOutcome>, Result<Infrastructure, CollectorError>) {
    let mut infra = Infrastructure::new();
    let mut outcomes = Vec::new();

    for mut collector in builtin() {
        let meta = collector.metadata();

        if !collector.enabled(&cfg.sources) {
            outcomes.push(CollectorOutcome {
                name: meta.display_name.to_string(),
                status: CollectorStatus::Skipped,
            });
            continue;
        }

        let section = cfg.source_section(meta.config_key);
        if let Err(source) = collector.configure(section) {
            let err = CollectorError::Configure {
                collector: meta.display_name.to_string(),
                source,
            };
            outcomes.push(CollectorOutcome {
                name: meta.display_name.to_string(),
                status: CollectorStatus::Failed(err.to_string()),
            });
            return (outcomes, Err(err));
        }

        if let Err(source) = collector.collect(&mut infra) {
            let err = CollectorError::Collect {
                collector: meta.display_name.to_string(),
                source,
            };
            outcomes.push(CollectorOutcome {
                name: meta.display_name.to_string(),
                status: CollectorStatus::Failed(err.to_string()),
            });
            return (outcomes, Err(err));
        }

        outcomes.push(CollectorOutcome {
            name: meta.display_name.to_string(),
            status: CollectorStatus::Completed,
        });
    }

    merge(&mut infra);

    (outcomes, Ok(infra))
}

/// Validation report for one enabled collector.
#[derive(Clone, Debug)]
pub struct CollectorReport {
    pub name: String,
    pub issues: Vec<ValidationIssue>,
}

/// Configure and validate every enabled collector. Fail-slow: every issue
/// from every collector is reported.
pub fn validate(cfg: &Config) -> Vec<CollectorReport> {
    let mut reports = Vec::new();

    for mut collector in builtin() {
        let meta = collector.metadata();

        if !collector.enabled(&cfg.sources) {
            continue;
        }

        let section = cfg.source_section(meta.config_key);
        let issues = match collector.configure(section) {
            Ok(()) => collector.validate(),
            Err(err) => vec![ValidationIssue {
                field: format!("sources.{}", meta.config_key),
                message: err.to_string(),
                suggestion: format!("fix the {} section of your config", meta.config_key),
            }],
        };

        reports.push(CollectorReport {
            name: meta.display_name.to_string(),
            issues,
        });
    }

    reports
}

// ============================================================================
// Shared helpers
// ============================================================================

const DATABASE_KEYWORDS: &[&str] = &[
    "postgres",
    "mysql",
    "mariadb",
    "mongo",
    "redis",
    "memcached",
    "influxdb",
    "sqlite",
];

/// Classify a service from its image and name: database keywords win,
/// everything else is a plain container.
pub fn detect_service_kind(image: &str, name: &str) -> ServiceKind {
    let haystack = format!("{} {}", image.to_lowercase(), name.to_lowercase());
    for keyword in DATABASE_KEYWORDS {
        if haystack.contains(keyword) {
            return ServiceKind::Database;
        }
    }
    ServiceKind::Container
}
