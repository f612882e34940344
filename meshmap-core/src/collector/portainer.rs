//! Portainer collector: running containers from a Portainer instance via its
//! API, or from an equivalent static JSON file.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::Value;

use super::{
    detect_service_kind, Collector, CollectorMetadata, DetectHint, SourceError, ValidationIssue,
};
use crate::config::ConfigError;
use crate::model::{Infrastructure, ServerType, Service};
use crate::port::{PortMapping, Protocol};
use crate::util;

const API_KEY_ENV: &str = "MESHMAP_PORTAINER_API_KEY";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PortainerCollector {
    pub url: String,
    pub api_key: String,
    /// Portainer endpoint (environment) id.
    pub endpoint: u32,
    /// Hostname the containers are assigned to.
    pub server: String,
    /// Static JSON file bypassing the API, for deterministic runs.
    pub test_file: String,
}

impl Default for PortainerCollector {
    fn default() -> Self {
        PortainerCollector {
            url: String::new(),
            api_key: String::new(),
            endpoint: 1,
            server: String::new(),
            test_file: String::new(),
        }
    }
}

impl Collector for PortainerCollector {
    fn metadata(&self) -> CollectorMetadata {
        CollectorMetadata {
            name: "portainer",
            display_name: "Portainer",
            description: "Collects containers from Portainer via its API",
            config_key: "portainer",
            detect_hint: DetectHint::None,
        }
    }

    fn enabled(&self, sources: &Value) -> bool {
        sources
            .get("portainer")
            .and_then(|s| s.get("url"))
            .and_then(Value::as_str)
            .is_some_and(|url| !url.is_empty())
    }

    fn configure(&mut self, section: Option<&Value>) -> Result<(), ConfigError> {
        if let Some(section) = section {
            *self = serde_yaml::from_value(section.clone())?;
        }
        if self.api_key.is_empty() {
            self.api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        }
        if self.endpoint == 0 {
            self.endpoint = 1;
        }
        Ok(())
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.url.is_empty() {
            issues.push(ValidationIssue {
                field: "sources.portainer.url".to_string(),
                message: "url is required".to_string(),
                suggestion: "set the URL of your Portainer instance, e.g. https://portainer.local:9443"
                    .to_string(),
            });
        }
        if self.api_key.is_empty() && self.test_file.is_empty() {
            issues.push(ValidationIssue {
                field: "sources.portainer.api_key".to_string(),
                message: "api_key is required".to_string(),
                suggestion: format!(
                    "create an API key in Portainer (User Settings → Access tokens) or set {API_KEY_ENV}"
                ),
            });
        }
        issues
    }

    fn collect(&self, infra: &mut Infrastructure) -> Result<(), SourceError> {
        let containers = self.get_containers()?;

        let server_name = if self.server.is_empty() {
            "portainer"
        } else {
            &self.server
        };
        let server = infra.ensure_server(server_name, ServerType::Lab);

        for c in containers {
            if c.state != "running" {
                continue;
            }

            let name = container_name(&c.names);
            let mut ports = Vec::new();
            for p in &c.ports {
                if p.public_port > 0 {
                    ports.push(PortMapping {
                        host_ip: None,
                        host_port: p.public_port,
                        container_port: p.private_port,
                        protocol: Protocol::from_str_lossy(&p.kind),
                    });
                }
            }

            // The compose project label doubles as a display category.
            let category = c
                .labels
                .get("com.docker.compose.project")
                .cloned()
                .unwrap_or_default();

            server.add_service(Service {
                kind: detect_service_kind(&c.image, &name),
                name,
                image: Some(c.image).filter(|i| !i.is_empty()),
                ports,
                category,
                ..Service::default()
            });
        }

        Ok(())
    }
}

impl PortainerCollector {
    fn get_containers(&self) -> Result<Vec<ApiContainer>, SourceError> {
        if !self.test_file.is_empty() {
            let data = std::fs::read(util::expand_path(&self.test_file))?;
            return Ok(serde_json::from_slice(&data)?);
        }

        let url = format!(
            "{}/api/endpoints/{}/docker/containers/json?all=false",
            self.url, self.endpoint
        );
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        let resp = client.get(&url).header("X-API-Key", &self.api_key).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Api {
                api: "portainer",
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }

        Ok(resp.json()?)
    }
}

/// Container names come as `["/name"]`; strip the leading slash.
fn container_name(names: &[String]) -> String {
    match names.first() {
        Some(name) => name.trim_start_matches('/').to_string(),
        None => "unknown".to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiContainer {
    #[serde(rename = "Names")]
    names: Vec<String>,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Ports")]
    ports: Vec<ApiPort>,
    #[serde(rename = "Labels")]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiPort {
    #[serde(rename = "PrivatePort")]
    private_port: u16,
    #[serde(rename = "PublicPort")]
    public_port: u16,
    #[serde(rename = "Type")]
    kind: String,
}
