//! Post-collection merge pass: correlates and classifies entities gathered
//! by multiple collectors. Runs exactly once, after all collectors finished.

use crate::categories::categorize;
use crate::model::{Infrastructure, ServerGroup, ServerType};

/// Correlate data across collectors: backfill service categories, then build
/// per-type server groups.
pub fn merge(infra: &mut Infrastructure) {
    categorize_services(infra);
    build_type_groups(infra);
}

fn categorize_services(infra: &mut Infrastructure) {
    for server in infra.servers.values_mut() {
        for svc in &mut server.services {
            if svc.category.is_empty() {
                svc.category = categorize(&svc.name, svc.image.as_deref().unwrap_or(""));
            }
        }
    }
}

/// One synthesized group per server type with at least one member, keyed by
/// the type's string value. Groups created directly by collectors keep their
/// own keys and coexist with these.
fn build_type_groups(infra: &mut Infrastructure) {
    for kind in ServerType::ALL {
        let members: Vec<String> = infra
            .servers
            .values()
            .filter(|s| s.kind == kind)
            .map(|s| s.hostname.clone())
            .collect();

        if members.is_empty() {
            continue;
        }

        infra.server_groups.insert(
            kind.as_str().to_string(),
            ServerGroup {
                name: kind.as_str().to_string(),
                label: kind.group_label().to_string(),
                servers: members,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Service, ServiceKind};

    #[test]
    fn test_merge_backfills_categories() {
        let mut infra = Infrastructure::new();
        let server = infra.ensure_server("atlas", ServerType::Lab);
        server.add_service(Service {
            name: "radarr".to_string(),
            image: Some("ghcr.io/hotio/radarr".to_string()),
            ..Service::default()
        });
        server.add_service(Service {
            name: "custom".to_string(),
            category: "preset".to_string(),
            ..Service::default()
        });

        merge(&mut infra);

        let services = &infra.servers["atlas"].services;
        assert_eq!(services[0].category, "media");
        // Pre-set categories are left alone.
        assert_eq!(services[1].category, "preset");
    }

    #[test]
    fn test_merge_builds_type_groups_and_omits_empty() {
        let mut infra = Infrastructure::new();
        infra.ensure_server("gw", ServerType::Production);
        infra.ensure_server("atlas", ServerType::Lab);
        infra.ensure_server("vault", ServerType::Lab);

        merge(&mut infra);

        assert_eq!(
            infra.server_groups["production"].servers,
            vec!["gw".to_string()]
        );
        let lab = &infra.server_groups["lab"];
        assert_eq!(lab.label, "Lab Servers");
        assert_eq!(lab.servers, vec!["atlas".to_string(), "vault".to_string()]);
        assert!(!infra.server_groups.contains_key("hypervisor"));
        assert!(!infra.server_groups.contains_key("local"));
    }

    #[test]
    fn test_merge_keeps_collector_groups() {
        let mut infra = Infrastructure::new();
        infra.ensure_server("gw", ServerType::Production);
        infra.server_groups.insert(
            "webservers".to_string(),
            ServerGroup {
                name: "webservers".to_string(),
                label: "webservers".to_string(),
                servers: vec!["gw".to_string()],
            },
        );

        merge(&mut infra);

        assert!(infra.server_groups.contains_key("webservers"));
        assert!(infra.server_groups.contains_key("production"));
    }

    #[test]
    fn test_merge_categorizes_system_services_too() {
        let mut infra = Infrastructure::new();
        let server = infra.ensure_server("gw", ServerType::Production);
        server.add_service(Service {
            name: "netdata".to_string(),
            kind: ServiceKind::System,
            ..Service::default()
        });

        merge(&mut infra);
        assert_eq!(infra.servers["gw"].services[0].category, "monitoring");
    }
}
