//! `meshmap init` - detect available data sources and write a starter
//! config.

use meshmap_core::collector::{self, CollectorMetadata, DetectHint};
use meshmap_core::util;

pub fn run(yes: bool) -> Result<(), String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("failed to get current directory: {e}"))?;

    let config_names = ["meshmap.yml", "meshmap.yaml", ".meshmap.yml", ".meshmap.yaml"];
    for name in &config_names {
        let path = cwd.join(name);
        if path.exists() {
            if !yes {
                return Err(format!(
                    "config file {} already exists, use --yes to overwrite",
                    path.display()
                ));
            }
            println!("Overwriting existing config: {}", path.display());
        }
    }

    println!("Detecting data sources...\n");

    let mut detected = Vec::new();
    for collector in collector::builtin() {
        let meta = collector.metadata();
        let found = match meta.detect_hint {
            DetectHint::File(file) => cwd.join(file).exists(),
            DetectHint::Binary(binary) => util::binary_on_path(binary),
            DetectHint::None => false,
        };

        let marker = if found { "✓" } else { "-" };
        println!("  {marker} {}: {}", meta.display_name, meta.description);
        if found {
            detected.push(meta);
        }
    }

    let yaml = starter_config(&detected);
    let output_path = cwd.join("meshmap.yml");
    std::fs::write(&output_path, &yaml).map_err(|e| format!("failed to write config: {e}"))?;

    println!("\nCreated: {}\n", output_path.display());
    println!("Next steps:");
    println!("  1. Review and customize meshmap.yml");
    println!("  2. Run 'meshmap validate' to check the configuration");
    println!("  3. Run 'meshmap generate' to produce the diagram");

    Ok(())
}

fn starter_config(detected: &[CollectorMetadata]) -> String {
    let enabled = |key: &str| detected.iter().any(|m| m.name == key);

    let mut out = String::new();
    out.push_str("# meshmap configuration — see 'meshmap validate' after editing\n");
    out.push_str("output: infrastructure.d2\n");
    out.push_str("theme: default\n");
    out.push_str("direction: right\n\n");
    out.push_str("display:\n  show_devices: true\n  group_by: category\n\n");
    out.push_str("render:\n  detail_level: standard\n\n");
    out.push_str("sources:\n");

    if enabled("ansible") {
        out.push_str("  ansible:\n    inventory: hosts.yml\n    # group_vars: group_vars\n");
    }
    if enabled("compose") {
        out.push_str("  compose:\n    files:\n      - path: docker-compose.yml\n        server: local\n");
    }
    if enabled("kubernetes") {
        out.push_str("  kubernetes: {}\n");
    }
    if enabled("tailscale") {
        out.push_str("  tailscale:\n    enabled: true\n");
    }
    if enabled("systemd") {
        out.push_str("  # systemd:\n  #   servers:\n  #     - host: myserver\n  #       ssh: user@myserver\n");
    }
    out.push_str("  # portainer:\n  #   url: https://portainer.local:9443\n  #   server: docklands\n");
    out.push_str("  # proxmox:\n  #   api_url: https://pve.local:8006\n");

    out
}
