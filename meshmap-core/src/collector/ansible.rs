//! Ansible inventory collector: parses a YAML inventory plus group_vars for
//! servers, their groups, and globally declared system services.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::Value;

use super::{Collector, CollectorMetadata, DetectHint, SourceError, ValidationIssue};
use crate::config::ConfigError;
use crate::model::{HealthCheck, Infrastructure, ServerGroup, ServerType, Service, ServiceKind};
use crate::port::PortMapping;
use crate::util;

const DEFAULT_PRIMARY_GROUP: &str = "tailnet";

/// System services declared through global port variables in `all.yml`.
const GLOBAL_SYSTEM_SERVICES: &[(&str, &str)] = &[
    ("netdata", "netdata_port"),
    ("cockpit", "cockpit_port"),
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnsibleCollector {
    /// Path to the inventory file (hosts.yml).
    pub inventory: String,
    /// Path to the group_vars directory.
    pub group_vars: String,
    /// Group holding the canonical server set; `tailnet` when unset.
    pub primary_group: String,
}

/// A single host's variables, as they appear under `hosts:` in the inventory.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct HostEntry {
    ansible_host: Option<String>,
    server_type: Option<String>,
    hostname: Option<String>,
    tailscale_hostname: Option<String>,
}

impl Collector for AnsibleCollector {
    fn metadata(&self) -> CollectorMetadata {
        CollectorMetadata {
            name: "ansible",
            display_name: "Ansible Inventory",
            description: "Parses Ansible YAML inventory and group_vars for servers and system services",
            config_key: "ansible",
            detect_hint: DetectHint::File("hosts.yml"),
        }
    }

    fn enabled(&self, sources: &Value) -> bool {
        sources
            .get("ansible")
            .and_then(|s| s.get("inventory"))
            .and_then(Value::as_str)
            .is_some_and(|inv| !inv.is_empty())
    }

    fn configure(&mut self, section: Option<&Value>) -> Result<(), ConfigError> {
        if let Some(section) = section {
            *self = serde_yaml::from_value(section.clone())?;
        }
        Ok(())
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if !self.inventory.is_empty() {
            let path = util::expand_path(&self.inventory);
            if !path.is_file() {
                issues.push(ValidationIssue {
                    field: "sources.ansible.inventory".to_string(),
                    message: format!("file not found: {}", self.inventory),
                    suggestion: "check the path or run 'meshmap init' to reconfigure".to_string(),
                });
            }
        }
        if !self.group_vars.is_empty() {
            let path = util::expand_path(&self.group_vars);
            if !path.is_dir() {
                issues.push(ValidationIssue {
                    field: "sources.ansible.group_vars".to_string(),
                    message: format!("directory not found: {}", self.group_vars),
                    suggestion: "check the path to your group_vars directory".to_string(),
                });
            }
        }
        issues
    }

    fn collect(&self, infra: &mut Infrastructure) -> Result<(), SourceError> {
        if self.inventory.is_empty() {
            return Ok(());
        }

        self.parse_inventory(infra)?;

        if !self.group_vars.is_empty() {
            self.parse_group_vars(infra)?;
        }

        Ok(())
    }
}

impl AnsibleCollector {
    fn primary_group(&self) -> &str {
        if self.primary_group.is_empty() {
            DEFAULT_PRIMARY_GROUP
        } else {
            &self.primary_group
        }
    }

    fn parse_inventory(&self, infra: &mut Infrastructure) -> Result<(), SourceError> {
        let path = util::expand_path(&self.inventory);
        let data = std::fs::read_to_string(&path)?;
        let inv: BTreeMap<String, Value> = serde_yaml::from_str(&data)?;

        // The bootstrap group carries public IPs keyed by overlay hostname.
        let mut bootstrap_ips: BTreeMap<String, String> = BTreeMap::new();
        if let Some(group) = inv.get("bootstrap") {
            for entry in extract_hosts(group).values() {
                if let (Some(ts), Some(ip)) = (&entry.tailscale_hostname, &entry.ansible_host) {
                    if !ts.is_empty() && !ip.is_empty() {
                        bootstrap_ips.insert(ts.to_lowercase(), ip.clone());
                    }
                }
            }
        }

        if let Some(group) = inv.get(self.primary_group()) {
            for (name, entry) in extract_hosts(group) {
                let hostname = entry
                    .hostname
                    .as_deref()
                    .filter(|h| !h.is_empty())
                    .unwrap_or(&name)
                    .to_lowercase();

                let kind = entry
                    .server_type
                    .as_deref()
                    .and_then(ServerType::from_key)
                    .unwrap_or(ServerType::Lab);

                let server = infra.ensure_server(&hostname, kind);
                if let Some(ip) = bootstrap_ips.get(&hostname) {
                    server.public_ip = Some(ip.clone());
                }
                server.groups = find_groups(&inv, &name);
            }
        }

        // Every non-"all" group becomes a server group.
        for (group_name, group_data) in &inv {
            if group_name == "all" {
                continue;
            }
            let hosts = extract_hosts(group_data);
            if hosts.is_empty() {
                continue;
            }
            infra.server_groups.insert(
                group_name.clone(),
                ServerGroup {
                    name: group_name.clone(),
                    label: group_name.clone(),
                    servers: hosts.keys().cloned().collect(),
                },
            );
        }

        Ok(())
    }

    fn parse_group_vars(&self, infra: &mut Infrastructure) -> Result<(), SourceError> {
        let base = util::expand_path(&self.group_vars);

        // all.yml carries global vars, including system service ports.
        let all_path = base.join("all.yml");
        if let Ok(data) = std::fs::read_to_string(&all_path) {
            if let Ok(vars) = serde_yaml::from_str::<Value>(&data) {
                extract_system_services(infra, &vars);
            }
        }

        // <primary_group>/vars.yml carries service_health_checks.
        let vars_path = base.join(self.primary_group()).join("vars.yml");
        if let Ok(data) = std::fs::read_to_string(&vars_path) {
            if let Ok(vars) = serde_yaml::from_str::<Value>(&data) {
                extract_health_checks(infra, &vars);
            }
        }

        Ok(())
    }
}

/// Pull host entries out of an inventory group structure.
fn extract_hosts(group: &Value) -> BTreeMap<String, HostEntry> {
    let mut out = BTreeMap::new();
    let Some(hosts) = group.get("hosts").and_then(Value::as_mapping) else {
        return out;
    };
    for (name, data) in hosts {
        let Some(name) = name.as_str() else { continue };
        // Hosts may be listed with no vars at all (`myhost:` → null).
        let entry = serde_yaml::from_value(data.clone()).unwrap_or_default();
        out.insert(name.to_string(), entry);
    }
    out
}

/// Every non-"all" group a host belongs to, by its inventory name.
fn find_groups(inv: &BTreeMap<String, Value>, host_name: &str) -> Vec<String> {
    inv.iter()
        .filter(|(name, _)| name.as_str() != "all")
        .filter(|(_, data)| extract_hosts(data).contains_key(host_name))
        .map(|(name, _)| name.clone())
        .collect()
}

fn extract_system_services(infra: &mut Infrastructure, vars: &Value) {
    for (name, port_key) in GLOBAL_SYSTEM_SERVICES {
        let Some(port) = vars.get(*port_key).and_then(util::as_int) else {
            continue;
        };
        let Ok(port) = u16::try_from(port) else {
            continue;
        };
        if port == 0 {
            continue;
        }
        for server in infra.servers.values_mut() {
            server.add_service(Service {
                name: (*name).to_string(),
                kind: ServiceKind::System,
                ports: vec![PortMapping::tcp(port, port)],
                ..Service::default()
            });
        }
    }
}

fn extract_health_checks(infra: &mut Infrastructure, vars: &Value) {
    let Some(checks) = vars
        .get("service_health_checks")
        .and_then(Value::as_mapping)
    else {
        return;
    };

    for (name, check) in checks {
        let Some(name) = name.as_str() else { continue };
        let int_field = |key: &str| check.get(key).and_then(util::as_int).unwrap_or(0);

        let hc = HealthCheck {
            port: u16::try_from(int_field("port")).unwrap_or(0),
            path: check
                .get("path")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            expected_status: u16::try_from(int_field("expected_status")).unwrap_or(0),
            timeout: u64::try_from(int_field("timeout")).unwrap_or(0),
        };

        for server in infra.servers.values_mut() {
            for svc in &mut server.services {
                if svc.name == name {
                    svc.health_check = Some(hc.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INVENTORY: &str = r#"
all:
  children: {}
bootstrap:
  hosts:
    gw-bootstrap:
      ansible_host: 203.0.113.10
      tailscale_hostname: gw
tailnet:
  hosts:
    gw:
      server_type: production
    Atlas:
      server_type: lab
    workstation:
      server_type: desktop
webservers:
  hosts:
    gw:
"#;

    fn write_inventory(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("hosts.yml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(INVENTORY.as_bytes()).unwrap();
        path
    }

    fn collector_for(dir: &std::path::Path) -> AnsibleCollector {
        AnsibleCollector {
            inventory: write_inventory(dir).to_string_lossy().into_owned(),
            ..AnsibleCollector::default()
        }
    }

    #[test]
    fn test_collect_servers_and_groups() {
        let dir = tempfile::tempdir().unwrap();
        let collector = collector_for(dir.path());

        let mut infra = Infrastructure::new();
        collector.collect(&mut infra).unwrap();

        assert_eq!(infra.servers.len(), 3);

        let gw = &infra.servers["gw"];
        assert_eq!(gw.kind, ServerType::Production);
        assert_eq!(gw.public_ip.as_deref(), Some("203.0.113.10"));
        assert!(gw.groups.contains(&"tailnet".to_string()));
        assert!(gw.groups.contains(&"webservers".to_string()));

        // Hostname keys are lowercased.
        assert!(infra.servers.contains_key("atlas"));
        // Unknown server_type falls back to lab.
        assert_eq!(infra.servers["workstation"].kind, ServerType::Lab);

        // Inventory groups become server groups; "all" does not.
        assert!(infra.server_groups.contains_key("webservers"));
        assert!(infra.server_groups.contains_key("bootstrap"));
        assert!(!infra.server_groups.contains_key("all"));
    }

    #[test]
    fn test_group_vars_system_services_and_health_checks() {
        let dir = tempfile::tempdir().unwrap();
        let inventory = write_inventory(dir.path());

        let gv = dir.path().join("group_vars");
        std::fs::create_dir_all(gv.join("tailnet")).unwrap();
        // Float port exercises lenient numeric coercion.
        std::fs::write(gv.join("all.yml"), "netdata_port: 19999.0\ncockpit_port: 9090\n")
            .unwrap();
        std::fs::write(
            gv.join("tailnet").join("vars.yml"),
            r#"
service_health_checks:
  netdata:
    port: 19999
    path: /api/v1/info
    expected_status: 200
    timeout: 5
"#,
        )
        .unwrap();

        let collector = AnsibleCollector {
            inventory: inventory.to_string_lossy().into_owned(),
            group_vars: gv.to_string_lossy().into_owned(),
            ..AnsibleCollector::default()
        };

        let mut infra = Infrastructure::new();
        collector.collect(&mut infra).unwrap();

        let gw = &infra.servers["gw"];
        let names: Vec<&str> = gw.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["netdata", "cockpit"]);
        assert_eq!(gw.services[0].kind, ServiceKind::System);
        assert_eq!(gw.services[0].ports, vec![PortMapping::tcp(19999, 19999)]);

        let hc = gw.services[0].health_check.as_ref().unwrap();
        assert_eq!(hc.port, 19999);
        assert_eq!(hc.path, "/api/v1/info");
        assert_eq!(hc.expected_status, 200);
        assert_eq!(hc.timeout, 5);
        assert!(gw.services[1].health_check.is_none());
    }

    #[test]
    fn test_enabled_requires_inventory() {
        let collector = AnsibleCollector::default();
        let on: Value = serde_yaml::from_str("ansible: {inventory: hosts.yml}").unwrap();
        let empty: Value = serde_yaml::from_str("ansible: {inventory: ''}").unwrap();
        let missing: Value = serde_yaml::from_str("compose: {}").unwrap();

        assert!(collector.enabled(&on));
        assert!(!collector.enabled(&empty));
        assert!(!collector.enabled(&missing));
    }

    #[test]
    fn test_configure_missing_section_is_noop() {
        let mut collector = AnsibleCollector::default();
        collector.configure(None).unwrap();
        assert!(collector.inventory.is_empty());
    }

    #[test]
    fn test_validate_reports_missing_paths() {
        let collector = AnsibleCollector {
            inventory: "/nonexistent/hosts.yml".to_string(),
            group_vars: "/nonexistent/group_vars".to_string(),
            ..AnsibleCollector::default()
        };
        let issues = collector.validate();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].field, "sources.ansible.inventory");
        assert_eq!(issues[1].field, "sources.ansible.group_vars");
    }

    #[test]
    fn test_collect_missing_inventory_fails() {
        let collector = AnsibleCollector {
            inventory: "/nonexistent/hosts.yml".to_string(),
            ..AnsibleCollector::default()
        };
        let mut infra = Infrastructure::new();
        assert!(matches!(
            collector.collect(&mut infra),
            Err(SourceError::Io(_))
        ));
    }
}
