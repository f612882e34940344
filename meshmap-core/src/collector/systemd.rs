//! systemd collector: running service units from local or remote servers,
//! with substring include/exclude filters.

use std::process::Command;

use serde::Deserialize;
use serde_yaml::Value;

use super::{
    detect_service_kind, Collector, CollectorMetadata, DetectHint, SourceError, ValidationIssue,
};
use crate::config::ConfigError;
use crate::model::{Infrastructure, ServerType, Service, ServiceKind};
use crate::util;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SystemdServer {
    pub host: String,
    /// `user@host` for remote execution over ssh; empty runs locally.
    pub ssh: String,
    /// Include only units whose name contains one of these.
    pub filter: Vec<String>,
    /// Exclude units whose name contains one of these.
    pub exclude: Vec<String>,
    /// Static JSON file bypassing systemctl, for deterministic runs.
    pub test_file: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SystemdCollector {
    pub servers: Vec<SystemdServer>,
}

impl Collector for SystemdCollector {
    fn metadata(&self) -> CollectorMetadata {
        CollectorMetadata {
            name: "systemd",
            display_name: "systemd Services",
            description: "Collects running systemd services from local or remote servers",
            config_key: "systemd",
            detect_hint: DetectHint::Binary("systemctl"),
        }
    }

    fn enabled(&self, sources: &Value) -> bool {
        sources
            .get("systemd")
            .and_then(|s| s.get("servers"))
            .and_then(Value::as_sequence)
            .is_some_and(|list| !list.is_empty())
    }

    fn configure(&mut self, section: Option<&Value>) -> Result<(), ConfigError> {
        if let Some(section) = section {
            *self = serde_yaml::from_value(section.clone())?;
        }
        Ok(())
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (i, srv) in self.servers.iter().enumerate() {
            if srv.host.is_empty() {
                issues.push(ValidationIssue {
                    field: format!("sources.systemd.servers[{i}].host"),
                    message: "host is required".to_string(),
                    suggestion: "set the hostname for this server".to_string(),
                });
            }
        }
        issues
    }

    fn collect(&self, infra: &mut Infrastructure) -> Result<(), SourceError> {
        for srv in &self.servers {
            let units = get_units(srv)?;
            let server = infra.ensure_server(&srv.host, ServerType::Lab);

            for unit in units {
                let name = unit
                    .unit
                    .strip_suffix(".service")
                    .unwrap_or(&unit.unit)
                    .to_string();

                if !srv.filter.is_empty() && !matches_any(&name, &srv.filter) {
                    continue;
                }
                if matches_any(&name, &srv.exclude) {
                    continue;
                }

                let kind = if detect_service_kind("", &name) == ServiceKind::Database {
                    ServiceKind::Database
                } else {
                    ServiceKind::System
                };

                server.add_service(Service {
                    name,
                    kind,
                    ..Service::default()
                });
            }
        }

        Ok(())
    }
}

/// One record of `systemctl list-units --output=json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SystemdUnit {
    unit: String,
}

fn get_units(srv: &SystemdServer) -> Result<Vec<SystemdUnit>, SourceError> {
    if !srv.test_file.is_empty() {
        let data = std::fs::read(util::expand_path(&srv.test_file))?;
        return Ok(serde_json::from_slice(&data)?);
    }

    let args = [
        "list-units",
        "--type=service",
        "--state=running",
        "--output=json",
    ];

    let mut cmd = if srv.ssh.is_empty() {
        let mut cmd = Command::new("systemctl");
        cmd.args(args);
        cmd
    } else {
        let mut cmd = Command::new("ssh");
        cmd.arg(&srv.ssh).arg("systemctl").args(args);
        cmd
    };

    let output = cmd.output().map_err(|e| SourceError::Command {
        command: "systemctl list-units".to_string(),
        message: e.to_string(),
    })?;
    if !output.status.success() {
        return Err(SourceError::Command {
            command: "systemctl list-units".to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(serde_json::from_slice(&output.stdout)?)
}

fn matches_any(name: &str, patterns: &[String]) -> bool {
    let lower = name.to_lowercase();
    patterns
        .iter()
        .any(|p| lower.contains(&p.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNITS: &str = r#"[
        {"unit": "nginx.service", "load": "loaded", "active": "active", "sub": "running", "description": "nginx"},
        {"unit": "postgresql.service", "load": "loaded", "active": "active", "sub": "running", "description": "PostgreSQL"},
        {"unit": "ssh.service", "load": "loaded", "active": "active", "sub": "running", "description": "OpenSSH"},
        {"unit": "systemd-journald.service", "load": "loaded", "active": "active", "sub": "running", "description": "journald"}
    ]"#;

    fn server_with(dir: &std::path::Path, filter: Vec<String>, exclude: Vec<String>) -> SystemdServer {
        let path = dir.join("units.json");
        std::fs::write(&path, UNITS).unwrap();
        SystemdServer {
            host: "atlas".to_string(),
            filter,
            exclude,
            test_file: path.to_string_lossy().into_owned(),
            ..SystemdServer::default()
        }
    }

    fn collect(server: SystemdServer) -> Infrastructure {
        let collector = SystemdCollector {
            servers: vec![server],
        };
        let mut infra = Infrastructure::new();
        collector.collect(&mut infra).unwrap();
        infra
    }

    #[test]
    fn test_collect_units() {
        let dir = tempfile::tempdir().unwrap();
        let infra = collect(server_with(dir.path(), vec![], vec![]));

        let server = &infra.servers["atlas"];
        assert_eq!(server.kind, ServerType::Lab);

        let names: Vec<&str> = server.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["nginx", "postgresql", "ssh", "systemd-journald"]);

        // Database keyword names get the database kind, the rest stay system.
        assert_eq!(server.services[0].kind, ServiceKind::System);
        assert_eq!(server.services[1].kind, ServiceKind::Database);
    }

    #[test]
    fn test_include_filter() {
        let dir = tempfile::tempdir().unwrap();
        let infra = collect(server_with(dir.path(), vec!["nginx".to_string()], vec![]));
        let names: Vec<&str> = infra.servers["atlas"]
            .services
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["nginx"]);
    }

    #[test]
    fn test_exclude_filter_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let infra = collect(server_with(
            dir.path(),
            vec![],
            vec!["SYSTEMD".to_string(), "ssh".to_string()],
        ));
        let names: Vec<&str> = infra.servers["atlas"]
            .services
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["nginx", "postgresql"]);
    }

    #[test]
    fn test_validate_requires_host() {
        let collector = SystemdCollector {
            servers: vec![SystemdServer::default()],
        };
        let issues = collector.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "sources.systemd.servers[0].host");
    }

    #[test]
    fn test_enabled_requires_servers() {
        let collector = SystemdCollector::default();
        let on: Value = serde_yaml::from_str("systemd: {servers: [{host: a}]}").unwrap();
        let off: Value = serde_yaml::from_str("systemd: {servers: []}").unwrap();
        assert!(collector.enabled(&on));
        assert!(!collector.enabled(&off));
    }
}
