//! Kubernetes collector: joins pods, services, and ingresses (fetched via
//! `kubectl` or static JSON files) into one synthesized server per namespace.

use std::collections::{BTreeMap, BTreeSet};
use std::process::Command;

use serde::Deserialize;
use serde_yaml::Value;

use super::{
    detect_service_kind, Collector, CollectorMetadata, DetectHint, SourceError, ValidationIssue,
};
use crate::config::ConfigError;
use crate::model::{Infrastructure, ServerType, Service, ServiceKind};
use crate::port::{PortMapping, Protocol};
use crate::util;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KubernetesCollector {
    pub kubeconfig: String,
    pub context: String,
    /// Namespace allow-list; empty means all namespaces.
    pub namespaces: Vec<String>,
    /// Static JSON files bypassing kubectl, for deterministic runs.
    pub test_pods: String,
    pub test_services: String,
    pub test_ingresses: String,
}

impl Collector for KubernetesCollector {
    fn metadata(&self) -> CollectorMetadata {
        CollectorMetadata {
            name: "kubernetes",
            display_name: "Kubernetes",
            description: "Collects pods, services, and ingresses from Kubernetes clusters",
            config_key: "kubernetes",
            detect_hint: DetectHint::Binary("kubectl"),
        }
    }

    fn enabled(&self, sources: &Value) -> bool {
        sources
            .get("kubernetes")
            .is_some_and(|s| s.is_mapping())
    }

    fn configure(&mut self, section: Option<&Value>) -> Result<(), ConfigError> {
        if let Some(section) = section {
            *self = serde_yaml::from_value(section.clone())?;
        }
        Ok(())
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if !self.kubeconfig.is_empty() && !util::expand_path(&self.kubeconfig).is_file() {
            issues.push(ValidationIssue {
                field: "sources.kubernetes.kubeconfig".to_string(),
                message: format!("file not found: {}", self.kubeconfig),
                suggestion: "check the path to your kubeconfig file".to_string(),
            });
        }
        let static_only = !self.test_pods.is_empty()
            && !self.test_services.is_empty()
            && !self.test_ingresses.is_empty();
        if !static_only && !util::binary_on_path("kubectl") {
            issues.push(ValidationIssue {
                field: "sources.kubernetes".to_string(),
                message: "kubectl not found in PATH".to_string(),
                suggestion: "install kubectl: https://kubernetes.io/docs/tasks/tools/".to_string(),
            });
        }
        issues
    }

    fn collect(&self, infra: &mut Infrastructure) -> Result<(), SourceError> {
        let pods: PodList = self.fetch(&self.test_pods, &["get", "pods", "-A", "-o", "json"])?;
        let services: ServiceList =
            self.fetch(&self.test_services, &["get", "svc", "-A", "-o", "json"])?;
        let ingresses: IngressList =
            self.fetch(&self.test_ingresses, &["get", "ingress", "-A", "-o", "json"])?;

        // Service port per workload: NodePort wins over ClusterIP port.
        let mut svc_ports: BTreeMap<String, u16> = BTreeMap::new();
        for svc in &services.items {
            if let Some(port) = svc.spec.ports.first() {
                let chosen = if port.node_port > 0 { port.node_port } else { port.port };
                svc_ports.insert(join_key(&svc.metadata.name, &svc.metadata.namespace), chosen);
            }
        }

        // Published hostname per workload, from ingress rules.
        let mut ingress_hosts: BTreeMap<String, String> = BTreeMap::new();
        for ing in &ingresses.items {
            for rule in &ing.spec.rules {
                let Some(http) = &rule.http else { continue };
                for path in &http.paths {
                    ingress_hosts.insert(
                        join_key(&path.backend.service.name, &ing.metadata.namespace),
                        rule.host.clone(),
                    );
                }
            }
        }

        // Group running pods by namespace.
        let mut ns_pods: BTreeMap<&str, Vec<&Pod>> = BTreeMap::new();
        for pod in &pods.items {
            if pod.status.phase != "Running" {
                continue;
            }
            let ns = pod.metadata.namespace.as_str();
            if !self.namespaces.is_empty() && !self.namespaces.iter().any(|n| n == ns) {
                continue;
            }
            ns_pods.entry(ns).or_default().push(pod);
        }

        for (ns, pod_list) in ns_pods {
            let server_name = format!("k8s-{ns}");
            let server = infra.ensure_server(&server_name, ServerType::Cluster);
            if server.label == server.hostname {
                server.label = format!("k8s/{ns}");
            }

            // Pods behind one deployment share an app label; deduplicate on it.
            let mut seen: BTreeSet<String> = BTreeSet::new();
            for pod in pod_list {
                for container in &pod.spec.containers {
                    let svc_name = pod
                        .metadata
                        .labels
                        .get("app")
                        .cloned()
                        .unwrap_or_else(|| container.name.clone());

                    if !seen.insert(svc_name.clone()) {
                        continue;
                    }

                    let key = join_key(&svc_name, ns);
                    let ports = if let Some(port) = svc_ports.get(&key) {
                        vec![PortMapping::tcp(*port, *port)]
                    } else if let Some(cp) = container.ports.first() {
                        vec![PortMapping {
                            host_ip: None,
                            host_port: 0,
                            container_port: cp.container_port,
                            protocol: Protocol::from_str_lossy(&cp.protocol),
                        }]
                    } else {
                        Vec::new()
                    };

                    let kind = if detect_service_kind(&container.image, &svc_name)
                        == ServiceKind::Database
                    {
                        ServiceKind::Database
                    } else {
                        ServiceKind::Pod
                    };

                    server.add_service(Service {
                        name: svc_name,
                        image: Some(container.image.clone()).filter(|i| !i.is_empty()),
                        kind,
                        ports,
                        ingress_host: ingress_hosts.get(&key).cloned(),
                        category: "kubernetes".to_string(),
                        ..Service::default()
                    });
                }
            }
        }

        Ok(())
    }
}

impl KubernetesCollector {
    fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        test_file: &str,
        args: &[&str],
    ) -> Result<T, SourceError> {
        let data = if test_file.is_empty() {
            self.kubectl(args)?
        } else {
            std::fs::read(util::expand_path(test_file))?
        };
        Ok(serde_json::from_slice(&data)?)
    }

    fn kubectl(&self, args: &[&str]) -> Result<Vec<u8>, SourceError> {
        let command = format!("kubectl {}", args.join(" "));
        let mut cmd = Command::new("kubectl");
        if !self.kubeconfig.is_empty() {
            cmd.arg("--kubeconfig").arg(util::expand_path(&self.kubeconfig));
        }
        if !self.context.is_empty() {
            cmd.arg("--context").arg(&self.context);
        }
        cmd.args(args);

        let output = cmd.output().map_err(|e| SourceError::Command {
            command: command.clone(),
            message: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(SourceError::Command {
                command,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

fn join_key(name: &str, namespace: &str) -> String {
    format!("{name}@{namespace}")
}

// ============================================================================
// kubectl JSON shapes (only the fields we read)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodList {
    items: Vec<Pod>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Pod {
    metadata: Meta,
    spec: PodSpec,
    status: PodStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Meta {
    name: String,
    namespace: String,
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodSpec {
    containers: Vec<PodContainer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodContainer {
    name: String,
    image: String,
    ports: Vec<ContainerPort>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContainerPort {
    #[serde(rename = "containerPort")]
    container_port: u16,
    protocol: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodStatus {
    phase: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceList {
    items: Vec<K8sService>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct K8sService {
    metadata: Meta,
    spec: ServiceSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceSpec {
    ports: Vec<ServicePort>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServicePort {
    port: u16,
    #[serde(rename = "nodePort")]
    node_port: u16,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IngressList {
    items: Vec<Ingress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Ingress {
    metadata: Meta,
    spec: IngressSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IngressSpec {
    rules: Vec<IngressRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IngressRule {
    host: String,
    http: Option<HttpRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HttpRule {
    paths: Vec<HttpPath>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HttpPath {
    backend: IngressBackend,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IngressBackend {
    service: BackendService,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendService {
    name: String,
}
