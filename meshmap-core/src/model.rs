//! The shared infrastructure model: one mutable aggregate that every
//! collector writes into and the renderer reads from. Rebuilt from scratch on
//! every run; only the active collector mutates it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::port::PortMapping;

/// Classifies a server's role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerType {
    Production,
    Lab,
    Local,
    Cluster,
    Hypervisor,
}

impl ServerType {
    pub const ALL: [ServerType; 5] = [
        ServerType::Production,
        ServerType::Lab,
        ServerType::Local,
        ServerType::Cluster,
        ServerType::Hypervisor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Production => "production",
            ServerType::Lab => "lab",
            ServerType::Local => "local",
            ServerType::Cluster => "cluster",
            ServerType::Hypervisor => "hypervisor",
        }
    }

    /// Display label for the synthesized per-type server group.
    pub fn group_label(&self) -> &'static str {
        match self {
            ServerType::Production => "Production",
            ServerType::Lab => "Lab Servers",
            ServerType::Local => "Local",
            ServerType::Cluster => "Kubernetes",
            ServerType::Hypervisor => "Hypervisors",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s {
            "production" => Some(ServerType::Production),
            "lab" => Some(ServerType::Lab),
            "local" => Some(ServerType::Local),
            "cluster" => Some(ServerType::Cluster),
            "hypervisor" => Some(ServerType::Hypervisor),
            _ => None,
        }
    }
}

/// Classifies a service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceKind {
    #[default]
    Container,
    Database,
    App,
    System,
    Vm,
    Lxc,
    Pod,
}

/// A volume binding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
}

/// A service health check, as declared in group variables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HealthCheck {
    pub port: u16,
    pub path: String,
    pub expected_status: u16,
    pub timeout: u64,
}

/// A container, application, VM, or system service running on a server.
#[derive(Clone, Debug, Default)]
pub struct Service {
    pub name: String,
    pub image: Option<String>,
    pub kind: ServiceKind,
    pub ports: Vec<PortMapping>,
    pub networks: Vec<String>,
    /// Declared dependencies by name; resolved against sibling services on
    /// the same server at render time.
    pub depends_on: Vec<String>,
    pub volumes: Vec<VolumeMount>,
    pub health_check: Option<HealthCheck>,
    /// Originating compose file, when the service came from one.
    pub compose_file: Option<PathBuf>,
    /// Published hostname from an ingress routing to this service.
    pub ingress_host: Option<String>,
    /// Presentation-only grouping label; empty means uncategorized.
    pub category: String,
}

/// A physical or virtual machine.
#[derive(Clone, Debug)]
pub struct Server {
    pub hostname: String,
    pub label: String,
    pub public_ip: Option<String>,
    pub tailscale_ip: Option<String>,
    pub kind: ServerType,
    pub os: Option<String>,
    pub online: bool,
    pub groups: Vec<String>,
    pub services: Vec<Service>,
}

impl Server {
    /// A fresh, online server with the label defaulting to the hostname.
    pub fn new(hostname: impl Into<String>, kind: ServerType) -> Self {
        let hostname = hostname.into();
        Server {
            label: hostname.clone(),
            hostname,
            public_ip: None,
            tailscale_ip: None,
            kind,
            os: None,
            online: true,
            groups: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn add_service(&mut self, service: Service) {
        self.services.push(service);
    }
}

/// A named bucket of servers, from source structure or synthesized by merge.
#[derive(Clone, Debug, Default)]
pub struct ServerGroup {
    pub name: String,
    pub label: String,
    /// Member hostnames.
    pub servers: Vec<String>,
}

/// A Tailscale peer that is not a server (phone, laptop, IoT). Never carries
/// services.
#[derive(Clone, Debug, Default)]
pub struct Device {
    pub hostname: String,
    pub os: Option<String>,
    pub tailscale_ip: Option<String>,
    pub online: bool,
    pub tags: Vec<String>,
}

/// A container network.
#[derive(Clone, Debug, Default)]
pub struct Network {
    pub name: String,
    pub driver: String,
    /// Names of services attached to this network.
    pub services: Vec<String>,
}

/// The top-level aggregate of all discovered infrastructure. Map keys are
/// always the lowercased hostname (or group/network name); BTreeMap keeps
/// iteration deterministic for the renderer.
#[derive(Clone, Debug, Default)]
pub struct Infrastructure {
    pub servers: BTreeMap<String, Server>,
    pub server_groups: BTreeMap<String, ServerGroup>,
    pub devices: BTreeMap<String, Device>,
    pub networks: BTreeMap<String, Network>,
    pub tailnet_name: Option<String>,
}

impl Infrastructure {
    pub fn new() -> Self {
        Infrastructure::default()
    }

    /// Fetch the server for `hostname`, creating it with the given type if it
    /// does not exist yet. The key is the lowercased hostname; all collectors
    /// go through here so that the same hostname resolves to the same entity
    /// regardless of source casing.
    pub fn ensure_server(&mut self, hostname: &str, kind: ServerType) -> &mut Server {
        let key = hostname.to_lowercase();
        self.servers
            .entry(key.clone())
            .or_insert_with(|| Server::new(key, kind))
    }

    pub fn server(&self, hostname: &str) -> Option<&Server> {
        self.servers.get(&hostname.to_lowercase())
    }

    pub fn server_mut(&mut self, hostname: &str) -> Option<&mut Server> {
        self.servers.get_mut(&hostname.to_lowercase())
    }

    pub fn service_count(&self) -> usize {
        self.servers.values().map(|s| s.services.len()).sum()
    }
}
