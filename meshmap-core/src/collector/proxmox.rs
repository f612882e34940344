//! Proxmox VE collector: cluster nodes become hypervisor servers, their
//! running VMs and LXC containers become services.

use std::time::Duration;

use serde::Deserialize;
use serde_yaml::Value;

use super::{Collector, CollectorMetadata, DetectHint, SourceError, ValidationIssue};
use crate::config::ConfigError;
use crate::model::{Infrastructure, ServerType, Service, ServiceKind};
use crate::util;

const TOKEN_ID_ENV: &str = "MESHMAP_PROXMOX_TOKEN_ID";
const TOKEN_ENV: &str = "MESHMAP_PROXMOX_TOKEN";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProxmoxCollector {
    pub api_url: String,
    pub token_id: String,
    pub token: String,
    /// Accept self-signed TLS certificates.
    pub insecure: bool,
    /// Static JSON files bypassing the API, for deterministic runs.
    pub test_nodes: String,
    pub test_resources: String,
}

impl Collector for ProxmoxCollector {
    fn metadata(&self) -> CollectorMetadata {
        CollectorMetadata {
            name: "proxmox",
            display_name: "Proxmox VE",
            description: "Collects VMs and LXC containers from Proxmox VE clusters",
            config_key: "proxmox",
            detect_hint: DetectHint::None,
        }
    }

    fn enabled(&self, sources: &Value) -> bool {
        sources
            .get("proxmox")
            .and_then(|s| s.get("api_url"))
            .and_then(Value::as_str)
            .is_some_and(|url| !url.is_empty())
    }

    fn configure(&mut self, section: Option<&Value>) -> Result<(), ConfigError> {
        if let Some(section) = section {
            *self = serde_yaml::from_value(section.clone())?;
        }
        if self.token_id.is_empty() {
            self.token_id = std::env::var(TOKEN_ID_ENV).unwrap_or_default();
        }
        if self.token.is_empty() {
            self.token = std::env::var(TOKEN_ENV).unwrap_or_default();
        }
        Ok(())
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.api_url.is_empty() {
            issues.push(ValidationIssue {
                field: "sources.proxmox.api_url".to_string(),
                message: "api_url is required".to_string(),
                suggestion: "set the URL of your Proxmox VE instance, e.g. https://pve.local:8006"
                    .to_string(),
            });
        }
        let static_only = !self.test_nodes.is_empty() && !self.test_resources.is_empty();
        if !static_only && (self.token_id.is_empty() || self.token.is_empty()) {
            issues.push(ValidationIssue {
                field: "sources.proxmox.token_id".to_string(),
                message: "token_id and token are required for API authentication".to_string(),
                suggestion:
                    "create an API token in Proxmox: Datacenter → Permissions → API Tokens"
                        .to_string(),
            });
        }
        issues
    }

    fn collect(&self, infra: &mut Infrastructure) -> Result<(), SourceError> {
        let nodes: Vec<PveNode> = self.get(&self.test_nodes, "/api2/json/nodes")?;
        let resources: Vec<PveResource> =
            self.get(&self.test_resources, "/api2/json/cluster/resources?type=vm")?;

        for node in &nodes {
            // A node already known from another source is upgraded to a
            // hypervisor; nothing else of it is touched.
            let existed = infra.server(&node.node).is_some();
            let server = infra.ensure_server(&node.node, ServerType::Hypervisor);
            server.kind = ServerType::Hypervisor;
            if !existed {
                server.online = node.status == "online";
            }
        }

        for res in &resources {
            if res.status != "running" {
                continue;
            }
            let Some(server) = infra.server_mut(&res.node) else {
                continue;
            };

            let kind = if res.kind == "lxc" {
                ServiceKind::Lxc
            } else {
                ServiceKind::Vm
            };

            server.add_service(Service {
                name: res.name.clone(),
                kind,
                category: "virtualization".to_string(),
                ..Service::default()
            });
        }

        Ok(())
    }
}

impl ProxmoxCollector {
    fn get<T: serde::de::DeserializeOwned>(
        &self,
        test_file: &str,
        path: &str,
    ) -> Result<T, SourceError> {
        let body = if test_file.is_empty() {
            self.api_request(path)?
        } else {
            std::fs::read(util::expand_path(test_file))?
        };
        let resp: PveResponse<T> = serde_json::from_slice(&body)?;
        Ok(resp.data)
    }

    fn api_request(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .danger_accept_invalid_certs(self.insecure)
            .build()?;

        let resp = client
            .get(format!("{}{}", self.api_url, path))
            .header(
                "Authorization",
                format!("PVEAPIToken={}={}", self.token_id, self.token),
            )
            .send()?;

        let status = resp.status();
        let body = resp.bytes()?;
        if !status.is_success() {
            return Err(SourceError::Api {
                api: "proxmox",
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct PveResponse<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PveNode {
    node: String,
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PveResource {
    #[serde(rename = "type")]
    kind: String,
    node: String,
    name: String,
    status: String,
}
