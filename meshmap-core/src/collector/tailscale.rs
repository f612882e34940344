//! Tailscale collector: peers from `tailscale status --json` (or a saved
//! copy). Runs last in the pipeline so it can enrich servers created by the
//! other sources; peers nobody else knows become servers or devices.

use std::collections::BTreeMap;
use std::process::Command;

use serde::Deserialize;
use serde_yaml::Value;

use super::{Collector, CollectorMetadata, DetectHint, SourceError, ValidationIssue};
use crate::config::ConfigError;
use crate::model::{Device, Infrastructure, ServerType};
use crate::util;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TailscaleCollector {
    /// Saved `tailscale status --json` output; empty runs the binary.
    pub json_file: String,
    pub include_offline: bool,
}

impl Collector for TailscaleCollector {
    fn metadata(&self) -> CollectorMetadata {
        CollectorMetadata {
            name: "tailscale",
            display_name: "Tailscale",
            description: "Collects Tailscale VPN peers, IPs, and online status",
            config_key: "tailscale",
            detect_hint: DetectHint::Binary("tailscale"),
        }
    }

    fn enabled(&self, sources: &Value) -> bool {
        sources
            .get("tailscale")
            .and_then(|s| s.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn configure(&mut self, section: Option<&Value>) -> Result<(), ConfigError> {
        if let Some(section) = section {
            *self = serde_yaml::from_value(section.clone())?;
        }
        Ok(())
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if !self.json_file.is_empty() {
            if !util::expand_path(&self.json_file).is_file() {
                issues.push(ValidationIssue {
                    field: "sources.tailscale.json_file".to_string(),
                    message: format!("file not found: {}", self.json_file),
                    suggestion: "check the path or remove json_file to use live tailscale status"
                        .to_string(),
                });
            }
        } else if !util::binary_on_path("tailscale") {
            issues.push(ValidationIssue {
                field: "sources.tailscale".to_string(),
                message: "tailscale binary not found in PATH".to_string(),
                suggestion: "install tailscale or provide a json_file path".to_string(),
            });
        }
        issues
    }

    fn collect(&self, infra: &mut Infrastructure) -> Result<(), SourceError> {
        let data = self.get_data()?;
        let status: Status = serde_json::from_slice(&data)?;

        if let Some(tailnet) = &status.current_tailnet {
            if !tailnet.name.is_empty() {
                infra.tailnet_name = Some(tailnet.name.clone());
            }
        }

        process_peer(infra, &status.self_peer);

        for peer in status.peers.values() {
            if !peer.online && !self.include_offline {
                continue;
            }
            process_peer(infra, peer);
        }

        Ok(())
    }
}

impl TailscaleCollector {
    fn get_data(&self) -> Result<Vec<u8>, SourceError> {
        if !self.json_file.is_empty() {
            return Ok(std::fs::read(util::expand_path(&self.json_file))?);
        }

        let output = Command::new("tailscale")
            .args(["status", "--json"])
            .output()
            .map_err(|e| SourceError::Command {
                command: "tailscale status --json".to_string(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(SourceError::Command {
                command: "tailscale status --json".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

fn process_peer(infra: &mut Infrastructure, peer: &Peer) {
    let hostname = peer.host_name.to_lowercase();
    if hostname.is_empty() {
        return;
    }

    let ts_ip = peer.tailscale_ips.first().cloned();

    // Enrichment, not overwrite: a server another collector already created
    // only gets the fields this source is authoritative for.
    if let Some(server) = infra.server_mut(&hostname) {
        server.tailscale_ip = ts_ip;
        server.os = Some(peer.os.clone()).filter(|os| !os.is_empty());
        server.online = peer.online;
        return;
    }

    let is_server = peer.tags.iter().any(|tag| tag.contains("server"));
    if is_server {
        let server = infra.ensure_server(&hostname, ServerType::Lab);
        server.tailscale_ip = ts_ip;
        server.os = Some(peer.os.clone()).filter(|os| !os.is_empty());
        server.online = peer.online;
        return;
    }

    infra.devices.insert(
        hostname.clone(),
        Device {
            hostname,
            os: Some(peer.os.clone()).filter(|os| !os.is_empty()),
            tailscale_ip: ts_ip,
            online: peer.online,
            tags: peer.tags.clone(),
        },
    );
}

// ============================================================================
// `tailscale status --json` shapes (only the fields we read)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Status {
    #[serde(rename = "Self")]
    self_peer: Peer,
    #[serde(rename = "Peer")]
    peers: BTreeMap<String, Peer>,
    #[serde(rename = "CurrentTailnet")]
    current_tailnet: Option<Tailnet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Tailnet {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct Peer {
    #[serde(rename = "HostName")]
    host_name: String,
    #[serde(rename = "OS")]
    os: String,
    #[serde(rename = "TailscaleIPs")]
    tailscale_ips: Vec<String>,
    #[serde(rename = "Online")]
    online: bool,
    #[serde(rename = "Tags")]
    tags: Vec<String>,
}
