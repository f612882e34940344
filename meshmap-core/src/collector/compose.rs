//! Docker Compose collector: parses compose files (explicit paths or scanned
//! directories) into services on a target server. Templated files get their
//! `{{ … }}` expressions neutralized before YAML parsing.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use walkdir::WalkDir;

use super::{
    detect_service_kind, Collector, CollectorMetadata, DetectHint, SourceError, ValidationIssue,
};
use crate::config::ConfigError;
use crate::model::{Infrastructure, Network, ServerType, Service, VolumeMount};
use crate::port::{PortMapping, Protocol};
use crate::util;

const COMPOSE_FILE_NAMES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Server a compose project's services are assigned to when none is
/// configured.
const DEFAULT_SERVER: &str = "local";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ComposeFile {
    pub path: String,
    /// Hostname the services belong to.
    pub server: String,
    /// Treat the file as a template and neutralize `{{ … }}` before parsing.
    pub template: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScanDir {
    pub path: String,
    pub server: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ComposeCollector {
    pub files: Vec<ComposeFile>,
    pub scan_dirs: Vec<ScanDir>,
}

impl Collector for ComposeCollector {
    fn metadata(&self) -> CollectorMetadata {
        CollectorMetadata {
            name: "compose",
            display_name: "Docker Compose",
            description: "Parses docker-compose files and templates for services",
            config_key: "compose",
            detect_hint: DetectHint::File("docker-compose.yml"),
        }
    }

    fn enabled(&self, sources: &Value) -> bool {
        let Some(section) = sources.get("compose") else {
            return false;
        };
        let non_empty = |key: &str| {
            section
                .get(key)
                .and_then(Value::as_sequence)
                .is_some_and(|list| !list.is_empty())
        };
        non_empty("files") || non_empty("scan_dirs")
    }

    fn configure(&mut self, section: Option<&Value>) -> Result<(), ConfigError> {
        if let Some(section) = section {
            *self = serde_yaml::from_value(section.clone())?;
        }
        Ok(())
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (i, f) in self.files.iter().enumerate() {
            if !util::expand_path(&f.path).is_file() {
                issues.push(ValidationIssue {
                    field: format!("sources.compose.files[{i}]"),
                    message: format!("file not found: {}", f.path),
                    suggestion: "check the path or remove this entry".to_string(),
                });
            }
        }
        for (i, d) in self.scan_dirs.iter().enumerate() {
            if !util::expand_path(&d.path).is_dir() {
                issues.push(ValidationIssue {
                    field: format!("sources.compose.scan_dirs[{i}]"),
                    message: format!("directory not found: {}", d.path),
                    suggestion: "check the path or remove this entry".to_string(),
                });
            }
        }
        issues
    }

    fn collect(&self, infra: &mut Infrastructure) -> Result<(), SourceError> {
        for f in &self.files {
            let path = util::expand_path(&f.path);
            self.parse_compose_file(infra, &path, &f.server, f.template)?;
        }

        for dir in &self.scan_dirs {
            let path = util::expand_path(&dir.path);
            self.scan_directory(infra, &path, &dir.server);
        }

        Ok(())
    }
}

impl ComposeCollector {
    /// Walk a directory tree for compose files. Individual parse failures are
    /// logged and skipped; only the walk itself never fails.
    fn scan_directory(&self, infra: &mut Infrastructure, dir: &Path, server: &str) {
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if !entry.file_type().is_dir() || entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !name.starts_with('.') && name != "node_modules" && name != "vendor"
            });

        for entry in walker {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !COMPOSE_FILE_NAMES.iter().any(|p| *p == name) {
                continue;
            }
            if let Err(err) = self.parse_compose_file(infra, entry.path(), server, false) {
                tracing::warn!(
                    path = %entry.path().display(),
                    error = %err,
                    "skipping unparsable compose file"
                );
            }
        }
    }

    fn parse_compose_file(
        &self,
        infra: &mut Infrastructure,
        path: &Path,
        server: &str,
        template: bool,
    ) -> Result<(), SourceError> {
        let file_err = |message: String| SourceError::File {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
        let content = if template || content.contains("{{") {
            util::strip_templates(&content)
        } else {
            content
        };

        let doc: ComposeDoc =
            serde_yaml::from_str(&content).map_err(|e| file_err(e.to_string()))?;

        let server_name = if server.is_empty() { DEFAULT_SERVER } else { server };

        let mut services = Vec::new();
        for (name, def) in &doc.services {
            let image = def.image.as_deref().unwrap_or("");
            services.push(Service {
                name: name.clone(),
                image: def.image.clone().filter(|i| !i.is_empty()),
                kind: detect_service_kind(image, name),
                ports: def.ports.iter().filter_map(PortEntry::to_mapping).collect(),
                networks: def.networks.names(),
                depends_on: def.depends_on.names(),
                volumes: def.volumes.iter().map(VolumeEntry::to_mount).collect(),
                compose_file: Some(path.to_path_buf()),
                ..Service::default()
            });
        }

        register_networks(infra, &doc, &services);

        let server = infra.ensure_server(server_name, ServerType::Local);
        for svc in services {
            server.add_service(svc);
        }

        Ok(())
    }
}

/// Record top-level networks and per-service attachments in the model.
fn register_networks(infra: &mut Infrastructure, doc: &ComposeDoc, services: &[Service]) {
    for (name, def) in &doc.networks {
        let net = infra
            .networks
            .entry(name.clone())
            .or_insert_with(|| Network {
                name: name.clone(),
                ..Network::default()
            });
        if let Some(driver) = def.get("driver").and_then(Value::as_str) {
            net.driver = driver.to_string();
        }
    }

    for svc in services {
        for net_name in &svc.networks {
            let net = infra
                .networks
                .entry(net_name.clone())
                .or_insert_with(|| Network {
                    name: net_name.clone(),
                    ..Network::default()
                });
            if !net.services.contains(&svc.name) {
                net.services.push(svc.name.clone());
            }
        }
    }
}

// ============================================================================
// Compose file schema
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposeDoc {
    services: BTreeMap<String, ComposeService>,
    networks: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposeService {
    image: Option<String>,
    ports: Vec<PortEntry>,
    networks: NameList,
    depends_on: NameList,
    volumes: Vec<VolumeEntry>,
}

/// Compose allows both list and mapping shapes for networks and depends_on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameList {
    List(Vec<String>),
    Map(BTreeMap<String, Value>),
}

impl Default for NameList {
    fn default() -> Self {
        NameList::List(Vec::new())
    }
}

impl NameList {
    fn names(&self) -> Vec<String> {
        match self {
            NameList::List(list) => list.clone(),
            NameList::Map(map) => map.keys().cloned().collect(),
        }
    }
}

/// Short string, bare number, or long mapping form of a port entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortEntry {
    Short(String),
    Number(u16),
    Long {
        #[serde(default)]
        published: Option<Value>,
        target: u16,
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        host_ip: Option<String>,
    },
}

impl PortEntry {
    fn to_mapping(&self) -> Option<PortMapping> {
        match self {
            PortEntry::Short(s) => {
                // Template placeholders left by stripping are dropped.
                let s = s.replace("PLACEHOLDER:", "");
                if s.is_empty() || s == "PLACEHOLDER" {
                    return None;
                }
                PortMapping::parse(&s).filter(|p| p.host_port > 0)
            }
            PortEntry::Number(n) => Some(PortMapping::tcp(*n, *n)),
            PortEntry::Long {
                published,
                target,
                protocol,
                host_ip,
            } => {
                let host_port = match published {
                    Some(Value::String(s)) => s.parse().ok()?,
                    Some(v) => u16::try_from(util::as_int(v)?).ok()?,
                    None => *target,
                };
                Some(PortMapping {
                    host_ip: host_ip.clone(),
                    host_port,
                    container_port: *target,
                    protocol: Protocol::from_str_lossy(protocol.as_deref().unwrap_or("tcp")),
                })
            }
        }
    }
}

/// Short `src:dst` string or long mapping form of a volume entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VolumeEntry {
    Short(String),
    Long {
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        target: Option<String>,
    },
}

impl VolumeEntry {
    fn to_mount(&self) -> VolumeMount {
        match self {
            VolumeEntry::Short(s) => match s.split_once(':') {
                Some((source, target)) => VolumeMount {
                    source: source.to_string(),
                    target: target.to_string(),
                },
                None => VolumeMount {
                    source: s.clone(),
                    target: String::new(),
                },
            },
            VolumeEntry::Long { source, target } => VolumeMount {
                source: source.clone().unwrap_or_default(),
                target: target.clone().unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceKind;

    const COMPOSE: &str = r#"
services:
  jellyfin:
    image: jellyfin/jellyfin:latest
    ports:
      - "8096:8096"
      - 1900
    networks:
      - media
    volumes:
      - ./config:/config
      - type: bind
        source: /mnt/media
        target: /media
  db:
    image: postgres:15-alpine
    ports:
      - "127.0.0.1:5432:5432"
    networks:
      backend:
        aliases: [postgres]
  app:
    image: myapp:latest
    depends_on:
      db:
        condition: service_healthy
networks:
  media:
    driver: bridge
  backend:
"#;

    fn write_compose(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn collect_file(path: &Path, server: &str, template: bool) -> Infrastructure {
        let collector = ComposeCollector {
            files: vec![ComposeFile {
                path: path.to_string_lossy().into_owned(),
                server: server.to_string(),
                template,
            }],
            ..ComposeCollector::default()
        };
        let mut infra = Infrastructure::new();
        collector.collect(&mut infra).unwrap();
        infra
    }

    #[test]
    fn test_collect_services() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_compose(dir.path(), "docker-compose.yml", COMPOSE);
        let infra = collect_file(&path, "nas", false);

        let server = &infra.servers["nas"];
        assert_eq!(server.kind, ServerType::Local);
        assert_eq!(server.services.len(), 3);

        let jellyfin = server.services.iter().find(|s| s.name == "jellyfin").unwrap();
        assert_eq!(jellyfin.kind, ServiceKind::Container);
        assert_eq!(jellyfin.ports[0], PortMapping::tcp(8096, 8096));
        assert_eq!(jellyfin.ports[1], PortMapping::tcp(1900, 1900));
        assert_eq!(jellyfin.networks, vec!["media".to_string()]);
        assert_eq!(
            jellyfin.volumes,
            vec![
                VolumeMount {
                    source: "./config".to_string(),
                    target: "/config".to_string()
                },
                VolumeMount {
                    source: "/mnt/media".to_string(),
                    target: "/media".to_string()
                },
            ]
        );
        assert_eq!(jellyfin.compose_file.as_deref(), Some(path.as_path()));

        let db = server.services.iter().find(|s| s.name == "db").unwrap();
        assert_eq!(db.kind, ServiceKind::Database);
        assert_eq!(db.ports[0].host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(db.networks, vec!["backend".to_string()]);

        let app = server.services.iter().find(|s| s.name == "app").unwrap();
        assert_eq!(app.depends_on, vec!["db".to_string()]);
    }

    #[test]
    fn test_networks_are_registered() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_compose(dir.path(), "docker-compose.yml", COMPOSE);
        let infra = collect_file(&path, "nas", false);

        let media = &infra.networks["media"];
        assert_eq!(media.driver, "bridge");
        assert_eq!(media.services, vec!["jellyfin".to_string()]);
        assert_eq!(infra.networks["backend"].services, vec!["db".to_string()]);
    }

    #[test]
    fn test_template_placeholders_are_neutralized() {
        let templated = r#"
services:
  galerie:
    image: "{{ registry }}/galerie:{{ tag }}"
    ports:
      - "{{ galerie_port }}:3000"
      - "3001:3001"
"#;
        let dir = tempfile::tempdir().unwrap();
        let path = write_compose(dir.path(), "docker-compose.yml.j2", templated);
        let infra = collect_file(&path, "gw", true);

        let svc = &infra.servers["gw"].services[0];
        // The templated half of the first binding is stripped; the literal
        // container port survives.
        assert_eq!(
            svc.ports,
            vec![PortMapping::tcp(3000, 3000), PortMapping::tcp(3001, 3001)]
        );
        assert_eq!(svc.image.as_deref(), Some("PLACEHOLDER/galerie:PLACEHOLDER"));
    }

    #[test]
    fn test_scan_dirs_skips_irrelevant_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        write_compose(
            &dir.path().join("app"),
            "compose.yml",
            "services:\n  gitea:\n    image: gitea/gitea\n",
        );
        write_compose(
            &dir.path().join("node_modules/pkg"),
            "docker-compose.yml",
            "services:\n  ignored:\n    image: x\n",
        );
        write_compose(dir.path(), "docker-compose.yml", "services: [broken");

        let collector = ComposeCollector {
            scan_dirs: vec![ScanDir {
                path: dir.path().to_string_lossy().into_owned(),
                server: "scanhost".to_string(),
            }],
            ..ComposeCollector::default()
        };
        let mut infra = Infrastructure::new();
        collector.collect(&mut infra).unwrap();

        let names: Vec<&str> = infra.servers["scanhost"]
            .services
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["gitea"]);
    }

    #[test]
    fn test_default_server_when_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_compose(
            dir.path(),
            "compose.yml",
            "services:\n  web:\n    image: nginx\n",
        );
        let infra = collect_file(&path, "", false);
        assert!(infra.servers.contains_key("local"));
    }

    #[test]
    fn test_enabled() {
        let collector = ComposeCollector::default();
        let with_files: Value =
            serde_yaml::from_str("compose: {files: [{path: a.yml, server: s}]}").unwrap();
        let with_dirs: Value =
            serde_yaml::from_str("compose: {scan_dirs: [{path: /x, server: s}]}").unwrap();
        let empty: Value = serde_yaml::from_str("compose: {files: []}").unwrap();

        assert!(collector.enabled(&with_files));
        assert!(collector.enabled(&with_dirs));
        assert!(!collector.enabled(&empty));
        assert!(!collector.enabled(&Value::Null));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let collector = ComposeCollector {
            files: vec![ComposeFile {
                path: "/nonexistent/docker-compose.yml".to_string(),
                server: "s".to_string(),
                template: false,
            }],
            ..ComposeCollector::default()
        };
        let mut infra = Infrastructure::new();
        assert!(matches!(
            collector.collect(&mut infra),
            Err(SourceError::File { .. })
        ));
    }
}
