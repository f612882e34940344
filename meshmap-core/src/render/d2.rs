//! D2 text generation. Output is byte-deterministic for a given model and
//! config: the model's maps are ordered, and every remaining collection is
//! sorted before emission.

use std::collections::{BTreeMap, BTreeSet};

use super::icons::{lookup_icon, lookup_os_icon};
use super::theme::{theme, Theme};
use super::DetailLevel;
use crate::config::Config;
use crate::model::{Infrastructure, Server, ServerType, Service, ServiceKind};
use crate::util::{quote, sanitize_id};

/// Classification groups render in this fixed order.
const GROUP_ORDER: [ServerType; 5] = [
    ServerType::Production,
    ServerType::Lab,
    ServerType::Cluster,
    ServerType::Hypervisor,
    ServerType::Local,
];

/// Servers with more rendered services than this get a grid layout.
const GRID_THRESHOLD: usize = 8;

/// Generate a D2 diagram from infrastructure data.
pub fn render_d2(infra: &Infrastructure, cfg: &Config) -> String {
    D2Renderer {
        infra,
        cfg,
        theme: theme(&cfg.theme),
        detail: cfg.render.detail_level,
    }
    .render()
}

struct D2Renderer<'a> {
    infra: &'a Infrastructure,
    cfg: &'a Config,
    theme: &'static Theme,
    detail: DetailLevel,
}

impl D2Renderer<'_> {
    fn render(&self) -> String {
        let mut out = String::new();

        let direction = if self.cfg.direction.is_empty() {
            "right"
        } else {
            self.cfg.direction.as_str()
        };
        out.push_str(&format!("direction: {direction}\n\n"));

        let tailnet_label = match &self.infra.tailnet_name {
            Some(name) => format!("Tailscale — {name}"),
            None => "Tailscale VPN".to_string(),
        };
        out.push_str(&format!("tailnet: {} {{\n", quote(&tailnet_label)));

        for kind in GROUP_ORDER {
            let servers = self.servers_of(kind);
            if servers.is_empty() {
                continue;
            }

            let group_label = self
                .infra
                .server_groups
                .get(kind.as_str())
                .map(|g| g.label.as_str())
                .unwrap_or_else(|| kind.as_str());
            let color = self.theme.server_color(kind);

            out.push_str(&format!(
                "  {}: {} {{\n",
                sanitize_id(kind.as_str()),
                quote(group_label)
            ));
            out.push_str(&format!("    style.fill: {}\n", quote(color.fill)));
            out.push_str(&format!("    style.stroke: {}\n", quote(color.stroke)));
            out.push('\n');

            for server in &servers {
                self.render_server(&mut out, server, "    ");
            }

            out.push_str("  }\n\n");
        }

        if self.cfg.display.show_devices
            && !self.infra.devices.is_empty()
            && self.detail != DetailLevel::Minimal
        {
            self.render_devices(&mut out);
        }

        out.push_str("}\n\n");

        if self.detail != DetailLevel::Minimal {
            self.render_external(&mut out);
        }

        out
    }

    fn render_server(&self, out: &mut String, server: &Server, indent: &str) {
        let id = sanitize_id(&server.hostname);
        let label = match &server.public_ip {
            Some(ip) if self.detail != DetailLevel::Minimal => {
                format!("{} — {}", server.hostname, ip)
            }
            _ => server.hostname.clone(),
        };

        out.push_str(&format!("{indent}{id}: {} {{\n", quote(&label)));

        if self.detail != DetailLevel::Minimal {
            if let Some(icon) = server.os.as_deref().and_then(lookup_os_icon) {
                out.push_str(&format!("{indent}  icon: {icon}\n"));
            }
            if let Some(ts_ip) = &server.tailscale_ip {
                out.push_str(&format!(
                    "{indent}  tooltip: {}\n",
                    quote(&format!("Tailscale: {ts_ip}"))
                ));
            }

            let (services, system_count) = self.filter_services(&server.services);
            let rendered = services.len() + usize::from(system_count > 0);
            if rendered > GRID_THRESHOLD {
                out.push_str(&format!("{indent}  grid-columns: 4\n"));
            }

            let inner = format!("{indent}  ");
            if self.grouping_applies(server, &services) {
                self.render_grouped_services(out, &services, &inner);
            } else {
                self.render_flat_services(out, &services, &inner);
            }
            if system_count > 0 {
                self.render_system_summary(out, system_count, &inner);
            }
        }

        out.push_str(&format!("{indent}}}\n"));
    }

    /// The services rendered individually at the current detail level, plus
    /// the number of system services collapsed into a summary node. At
    /// `detailed` nothing collapses.
    fn filter_services<'b>(&self, services: &'b [Service]) -> (Vec<&'b Service>, usize) {
        if self.detail == DetailLevel::Detailed {
            return (services.iter().collect(), 0);
        }

        let mut kept = Vec::new();
        let mut system_count = 0;
        for svc in services {
            if svc.kind == ServiceKind::System {
                system_count += 1;
            } else {
                kept.push(svc);
            }
        }
        (kept, system_count)
    }

    /// Category sub-grouping applies to local servers with more than one
    /// category present, when requested by config.
    fn grouping_applies(&self, server: &Server, services: &[&Service]) -> bool {
        if server.kind != ServerType::Local || self.cfg.display.group_by != "category" {
            return false;
        }
        let categories: BTreeSet<&str> =
            services.iter().map(|s| category_or_default(s)).collect();
        categories.len() > 1
    }

    fn render_flat_services(&self, out: &mut String, services: &[&Service], indent: &str) {
        let mut sorted = services.to_vec();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        for svc in sorted {
            self.render_service(out, svc, indent);
        }
    }

    fn render_grouped_services(&self, out: &mut String, services: &[&Service], indent: &str) {
        let mut groups: BTreeMap<&str, Vec<&Service>> = BTreeMap::new();
        for svc in services {
            groups
                .entry(category_or_default(svc))
                .or_default()
                .push(*svc);
        }

        for (name, svcs) in groups {
            out.push_str(&format!(
                "{indent}{}: {} {{\n",
                sanitize_id(name),
                quote(&capitalize(name))
            ));
            self.render_flat_services(out, &svcs, &format!("{indent}  "));
            out.push_str(&format!("{indent}}}\n"));
        }
    }

    fn render_system_summary(&self, out: &mut String, count: usize, indent: &str) {
        let color = self.theme.element_color("system");
        out.push_str(&format!(
            "{indent}system-services: {} {{\n",
            quote(&format!("System ({count})"))
        ));
        out.push_str(&format!("{indent}  style.fill: {}\n", quote(color.fill)));
        out.push_str(&format!("{indent}  style.stroke: {}\n", quote(color.stroke)));
        out.push_str(&format!("{indent}}}\n"));
    }

    fn render_service(&self, out: &mut String, svc: &Service, indent: &str) {
        let id = sanitize_id(&svc.name);
        let label = self.service_label(svc);
        let props = self.service_properties(svc);

        if props.is_empty() {
            out.push_str(&format!("{indent}{id}: {}\n", quote(&label)));
        } else {
            out.push_str(&format!("{indent}{id}: {} {{\n", quote(&label)));
            for prop in props {
                out.push_str(&format!("{indent}  {prop}\n"));
            }
            out.push_str(&format!("{indent}}}\n"));
        }
    }

    fn service_label(&self, svc: &Service) -> String {
        let display = smart_service_name(&svc.name, svc.image.as_deref());

        if self.detail == DetailLevel::Detailed {
            let ports: Vec<String> = svc
                .ports
                .iter()
                .filter(|p| p.host_port > 0)
                .map(|p| format!(":{}", p.host_port))
                .collect();
            if ports.is_empty() {
                return display;
            }
            return format!("{} {}", display, ports.join(" "));
        }

        match svc.ports.first() {
            Some(p) if p.host_port > 0 => format!("{} :{}", display, p.host_port),
            _ => display,
        }
    }

    fn service_properties(&self, svc: &Service) -> Vec<String> {
        let mut props = Vec::new();

        match svc.kind {
            ServiceKind::Database => {
                let color = self.theme.element_color("database");
                props.push("shape: cylinder".to_string());
                props.push(format!("style.fill: {}", quote(color.fill)));
                props.push(format!("style.stroke: {}", quote(color.stroke)));
            }
            ServiceKind::Vm => props.push("shape: rectangle".to_string()),
            ServiceKind::Lxc => props.push("shape: hexagon".to_string()),
            ServiceKind::System => {
                let color = self.theme.element_color("system");
                props.push(format!("style.fill: {}", quote(color.fill)));
                props.push(format!("style.stroke: {}", quote(color.stroke)));
            }
            _ => {}
        }

        if let Some(icon) = lookup_icon(&svc.name, svc.image.as_deref().unwrap_or("")) {
            props.push(format!("icon: {icon}"));
        }

        if self.detail == DetailLevel::Detailed {
            if let Some(tooltip) = self.service_tooltip(svc) {
                props.push(format!("tooltip: {}", quote(&tooltip)));
            }
        }

        props
    }

    fn service_tooltip(&self, svc: &Service) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(host) = &svc.ingress_host {
            parts.push(format!("ingress: {host}"));
        }
        if let Some(hc) = &svc.health_check {
            parts.push(format!("health: GET {} → {}", hc.path, hc.expected_status));
        }
        if self.cfg.display.show_volumes && !svc.volumes.is_empty() {
            let mounts: Vec<String> = svc
                .volumes
                .iter()
                .map(|v| format!("{}→{}", v.source, v.target))
                .collect();
            parts.push(format!("volumes: {}", mounts.join(", ")));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" | "))
        }
    }

    fn render_devices(&self, out: &mut String) {
        let color = self.theme.element_color("devices");
        out.push_str("  devices: \"Other Devices\" {\n");
        out.push_str(&format!("    style.fill: {}\n", quote(color.fill)));
        out.push_str(&format!("    style.stroke: {}\n", quote(color.stroke)));
        out.push('\n');

        for device in self.infra.devices.values() {
            let id = sanitize_id(&device.hostname);
            let label = match &device.os {
                Some(os) if self.detail == DetailLevel::Detailed => {
                    format!("{} ({})", device.hostname, os)
                }
                _ => device.hostname.clone(),
            };

            match device.os.as_deref().and_then(lookup_os_icon) {
                Some(icon) => out.push_str(&format!(
                    "    {id}: {} {{\n      icon: {icon}\n    }}\n",
                    quote(&label)
                )),
                None => out.push_str(&format!("    {id}: {}\n", quote(&label))),
            }
        }

        out.push_str("  }\n\n");
    }

    /// Synthesized internet → edge chain for production servers, plus
    /// dependency edges between sibling services.
    fn render_external(&self, out: &mut String) {
        let production = self.servers_of(ServerType::Production);
        if !production.is_empty() {
            let cloud = self.theme.element_color("cloud");
            out.push_str(&format!(
                "edge: \"Edge\" {{\n  shape: cloud\n  style.fill: {}\n  style.stroke: {}\n}}\n",
                quote(cloud.fill),
                quote(cloud.stroke)
            ));
            out.push_str("internet: \"Internet\" {\n  shape: cloud\n}\n\n");
            out.push_str("internet -> edge { style.stroke-dash: 3 }\n");

            for server in &production {
                let sid = sanitize_id(&server.hostname);
                // Point at the first non-system service, or the server itself.
                let target = server
                    .services
                    .iter()
                    .find(|svc| svc.kind != ServiceKind::System)
                    .map(|svc| format!("tailnet.production.{sid}.{}", sanitize_id(&svc.name)))
                    .unwrap_or_else(|| format!("tailnet.production.{sid}"));
                out.push_str(&format!("edge -> {target}\n"));
            }
        }

        for server in self.infra.servers.values() {
            let siblings: BTreeMap<&str, &Service> = server
                .services
                .iter()
                .map(|s| (s.name.as_str(), s))
                .collect();

            let mut services: Vec<&Service> = server.services.iter().collect();
            services.sort_by(|a, b| a.name.cmp(&b.name));

            for svc in services {
                for dep in &svc.depends_on {
                    // Dependencies resolve against sibling services only.
                    let Some(dep_svc) = siblings.get(dep.as_str()) else {
                        continue;
                    };
                    // Collapsed system services have no node to point at.
                    if self.detail != DetailLevel::Detailed
                        && (svc.kind == ServiceKind::System
                            || dep_svc.kind == ServiceKind::System)
                    {
                        continue;
                    }

                    let from = self.service_path(server, svc);
                    let to = self.service_path(server, dep_svc);
                    if self.detail == DetailLevel::Detailed {
                        out.push_str(&format!(
                            "{from} -> {to}: \"depends_on\" {{ style.stroke-dash: 3 }}\n"
                        ));
                    } else {
                        out.push_str(&format!("{from} -> {to} {{ style.stroke-dash: 3 }}\n"));
                    }
                }
            }
        }
    }

    /// The full D2 path of a service node, including the category container
    /// when the server renders its services grouped.
    fn service_path(&self, server: &Server, svc: &Service) -> String {
        let gid = sanitize_id(server.kind.as_str());
        let sid = sanitize_id(&server.hostname);
        let svc_id = sanitize_id(&svc.name);

        let (services, _) = self.filter_services(&server.services);
        if self.grouping_applies(server, &services) {
            let cat = sanitize_id(category_or_default(svc));
            format!("tailnet.{gid}.{sid}.{cat}.{svc_id}")
        } else {
            format!("tailnet.{gid}.{sid}.{svc_id}")
        }
    }

    fn servers_of(&self, kind: ServerType) -> Vec<&Server> {
        // BTreeMap iteration keeps these hostname-sorted.
        self.infra
            .servers
            .values()
            .filter(|s| s.kind == kind)
            .collect()
    }
}

fn category_or_default(svc: &Service) -> &str {
    if svc.category.is_empty() {
        "services"
    } else {
        &svc.category
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Display names for generic service names, derived from the image.
const PRODUCT_NAMES: &[(&str, &str)] = &[
    ("postgres", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("mariadb", "MariaDB"),
    ("redis", "Redis"),
    ("mongo", "MongoDB"),
    ("memcached", "Memcached"),
    ("influxdb", "InfluxDB"),
    ("nginx", "Nginx"),
    ("traefik", "Traefik"),
    ("caddy", "Caddy"),
];

const GENERIC_NAMES: &[&str] = &[
    "db", "database", "cache", "proxy", "web", "server", "app", "api",
];

/// Rewrite generic service names (`db`, `proxy`, …) to a product name taken
/// from the image; everything else passes through unchanged.
fn smart_service_name(name: &str, image: Option<&str>) -> String {
    let name_lower = name.to_lowercase();
    if !GENERIC_NAMES.contains(&name_lower.as_str()) {
        return name.to_string();
    }
    let Some(image) = image else {
        return name.to_string();
    };

    let image_lower = image.to_lowercase();
    for (key, display) in PRODUCT_NAMES {
        if image_lower.contains(key) {
            return (*display).to_string();
        }
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Device;
    use crate::port::PortMapping;

    fn config() -> Config {
        Config::default()
    }

    fn config_with_detail(detail: DetailLevel) -> Config {
        let mut cfg = Config::default();
        cfg.render.detail_level = detail;
        cfg
    }

    fn sample_infra() -> Infrastructure {
        let mut infra = Infrastructure::new();

        let gateway = infra.ensure_server("gateway", ServerType::Production);
        gateway.public_ip = Some("203.0.113.10".to_string());
        gateway.os = Some("linux".to_string());
        gateway.add_service(Service {
            name: "galerie".to_string(),
            image: Some("galerie:latest".to_string()),
            kind: ServiceKind::App,
            ports: vec![PortMapping::tcp(3000, 3000)],
            ..Service::default()
        });
        gateway.add_service(Service {
            name: "netdata".to_string(),
            kind: ServiceKind::System,
            ports: vec![PortMapping::tcp(19999, 19999)],
            ..Service::default()
        });

        let atlas = infra.ensure_server("atlas", ServerType::Lab);
        atlas.add_service(Service {
            name: "uptime-kuma".to_string(),
            image: Some("louislam/uptime-kuma:1".to_string()),
            ports: vec![PortMapping::tcp(3001, 3001)],
            ..Service::default()
        });

        infra.devices.insert(
            "user-phone".to_string(),
            Device {
                hostname: "user-phone".to_string(),
                os: Some("iOS".to_string()),
                online: true,
                ..Device::default()
            },
        );

        infra.tailnet_name = Some("user@example".to_string());
        crate::collector::merge(&mut infra);
        infra
    }

    #[test]
    fn test_render_basic_structure() {
        let infra = sample_infra();
        let output = render_d2(&infra, &config());

        assert!(output.contains("direction: right"));
        assert!(output.contains("tailnet: \"Tailscale — user@example\""));
        assert!(output.contains("production: \"Production\""));
        assert!(output.contains("lab: \"Lab Servers\""));
        assert!(output.contains("gateway: \"gateway — 203.0.113.10\""));
        assert!(output.contains("galerie: \"galerie :3000\""));
        assert!(output.contains("uptime-kuma: \"uptime-kuma :3001\""));
        assert!(output.contains("devices: \"Other Devices\""));
        assert!(output.contains("user-phone"));
        assert!(output.contains("internet: \"Internet\""));
        assert!(output.contains("edge -> tailnet.production.gateway.galerie"));
    }

    #[test]
    fn test_detail_level_contract() {
        let infra = sample_infra();

        let standard = render_d2(&infra, &config_with_detail(DetailLevel::Standard));
        assert!(standard.contains("system-services: \"System (1)\""));
        assert!(standard.contains("galerie: \"galerie :3000\""));
        assert!(!standard.contains("netdata: "));

        let detailed = render_d2(&infra, &config_with_detail(DetailLevel::Detailed));
        assert!(!detailed.contains("system-services"));
        assert!(detailed.contains("netdata: \"netdata :19999\""));
        assert!(detailed.contains("galerie: \"galerie :3000\""));

        let minimal = render_d2(&infra, &config_with_detail(DetailLevel::Minimal));
        assert!(!minimal.contains("system-services"));
        assert!(!minimal.contains("netdata"));
        assert!(!minimal.contains("galerie"));
        // Server labels carry no public IP, and no external chain renders.
        assert!(minimal.contains("gateway: \"gateway\""));
        assert!(!minimal.contains("internet"));
        assert!(!minimal.contains("tooltip"));
    }

    #[test]
    fn test_database_renders_as_cylinder() {
        let mut infra = Infrastructure::new();
        let server = infra.ensure_server("gw", ServerType::Production);
        server.add_service(Service {
            name: "db".to_string(),
            image: Some("postgres:15-alpine".to_string()),
            kind: ServiceKind::Database,
            ports: vec![PortMapping::tcp(5432, 5432)],
            ..Service::default()
        });

        let output = render_d2(&infra, &config());
        assert!(output.contains("shape: cylinder"));
        // Generic name rewritten from the image.
        assert!(output.contains("db: \"PostgreSQL :5432\""));
    }

    #[test]
    fn test_vm_and_lxc_shapes() {
        let mut infra = Infrastructure::new();
        let server = infra.ensure_server("pve1", ServerType::Hypervisor);
        server.add_service(Service {
            name: "opnsense".to_string(),
            kind: ServiceKind::Vm,
            ..Service::default()
        });
        server.add_service(Service {
            name: "pihole".to_string(),
            kind: ServiceKind::Lxc,
            ..Service::default()
        });

        let output = render_d2(&infra, &config());
        assert!(output.contains("shape: rectangle"));
        assert!(output.contains("shape: hexagon"));
    }

    #[test]
    fn test_devices_hidden_when_disabled() {
        let infra = sample_infra();
        let mut cfg = config();
        cfg.display.show_devices = false;

        let output = render_d2(&infra, &cfg);
        assert!(!output.contains("Other Devices"));
    }

    #[test]
    fn test_depends_on_edges() {
        let mut infra = Infrastructure::new();
        let server = infra.ensure_server("srv", ServerType::Lab);
        server.add_service(Service {
            name: "web".to_string(),
            depends_on: vec!["db".to_string(), "ghost".to_string()],
            ..Service::default()
        });
        server.add_service(Service {
            name: "db".to_string(),
            kind: ServiceKind::Database,
            ..Service::default()
        });

        let standard = render_d2(&infra, &config());
        assert!(standard
            .contains("tailnet.lab.srv.web -> tailnet.lab.srv.db { style.stroke-dash: 3 }"));
        // Unresolvable dependencies produce no edge.
        assert!(!standard.contains("ghost"));

        let detailed = render_d2(&infra, &config_with_detail(DetailLevel::Detailed));
        assert!(detailed.contains(
            "tailnet.lab.srv.web -> tailnet.lab.srv.db: \"depends_on\" { style.stroke-dash: 3 }"
        ));

        let minimal = render_d2(&infra, &config_with_detail(DetailLevel::Minimal));
        assert!(!minimal.contains("->"));
    }

    #[test]
    fn test_local_server_groups_by_category() {
        let mut infra = Infrastructure::new();
        let server = infra.ensure_server("workstation", ServerType::Local);
        server.add_service(Service {
            name: "jellyfin".to_string(),
            category: "media".to_string(),
            ..Service::default()
        });
        server.add_service(Service {
            name: "grafana".to_string(),
            category: "monitoring".to_string(),
            ..Service::default()
        });
        server.add_service(Service {
            name: "oddball".to_string(),
            ..Service::default()
        });

        let output = render_d2(&infra, &config());
        assert!(output.contains("media: \"Media\""));
        assert!(output.contains("monitoring: \"Monitoring\""));
        // Uncategorized services land in a generic container.
        assert!(output.contains("services: \"Services\""));
    }

    #[test]
    fn test_single_category_renders_flat() {
        let mut infra = Infrastructure::new();
        let server = infra.ensure_server("workstation", ServerType::Local);
        server.add_service(Service {
            name: "jellyfin".to_string(),
            category: "media".to_string(),
            ..Service::default()
        });
        server.add_service(Service {
            name: "plex".to_string(),
            category: "media".to_string(),
            ..Service::default()
        });

        let output = render_d2(&infra, &config());
        assert!(!output.contains("media: \"Media\""));
        assert!(output.contains("jellyfin"));
    }

    #[test]
    fn test_grouped_dependency_paths_include_category() {
        let mut infra = Infrastructure::new();
        let server = infra.ensure_server("workstation", ServerType::Local);
        server.add_service(Service {
            name: "radarr".to_string(),
            category: "media".to_string(),
            depends_on: vec!["gluetun".to_string()],
            ..Service::default()
        });
        server.add_service(Service {
            name: "gluetun".to_string(),
            category: "downloads".to_string(),
            ..Service::default()
        });

        let output = render_d2(&infra, &config());
        assert!(output.contains(
            "tailnet.local.workstation.media.radarr -> tailnet.local.workstation.downloads.gluetun"
        ));
    }

    #[test]
    fn test_grid_layout_for_many_services() {
        let mut infra = Infrastructure::new();
        let server = infra.ensure_server("dense", ServerType::Lab);
        for i in 0..9 {
            server.add_service(Service {
                name: format!("svc-{i}"),
                ..Service::default()
            });
        }

        let output = render_d2(&infra, &config());
        assert!(output.contains("grid-columns: 4"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let infra = sample_infra();
        let cfg = config_with_detail(DetailLevel::Detailed);
        let first = render_d2(&infra, &cfg);
        for _ in 0..5 {
            assert_eq!(render_d2(&infra, &cfg), first);
        }
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let infra = sample_infra();
        let mut cfg = config();
        cfg.theme = "does-not-exist".to_string();
        // Same colors as the default theme.
        assert_eq!(render_d2(&infra, &cfg), render_d2(&infra, &config()));
    }

    #[test]
    fn test_smart_service_name() {
        assert_eq!(smart_service_name("db", Some("postgres:15")), "PostgreSQL");
        assert_eq!(smart_service_name("proxy", Some("traefik:v3")), "Traefik");
        assert_eq!(smart_service_name("radarr", Some("postgres:15")), "radarr");
        assert_eq!(smart_service_name("db", None), "db");
        assert_eq!(smart_service_name("db", Some("custom:1")), "db");
    }
}
