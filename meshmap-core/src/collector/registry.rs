//! The collector registry: one explicit, ordered list of constructors.
//!
//! Order matters. Collectors that create base servers (inventory, compose)
//! run before collectors that enrich them; Tailscale runs last so its peer
//! data lands on servers the earlier sources already created.

use super::{
    AnsibleCollector, Collector, ComposeCollector, KubernetesCollector, PortainerCollector,
    ProxmoxCollector, SystemdCollector, TailscaleCollector,
};

/// Fresh instances of every built-in collector, in pipeline order.
pub fn builtin() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(AnsibleCollector::default()),
        Box::new(ComposeCollector::default()),
        Box::new(KubernetesCollector::default()),
        Box::new(PortainerCollector::default()),
        Box::new(ProxmoxCollector::default()),
        Box::new(SystemdCollector::default()),
        Box::new(TailscaleCollector::default()),
    ]
}
