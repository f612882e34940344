//! `meshmap generate` - run the collector pipeline and write the D2 diagram.

use std::path::{Path, PathBuf};
use std::process::Command;

use clap::Args;
use meshmap_core::collector::{self, CollectorStatus};
use meshmap_core::config::Config;
use meshmap_core::{render, util};

use super::load_config;

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Output D2 file path
    #[arg(short, long)]
    pub output: Option<String>,

    /// Detail level: minimal, standard, detailed
    #[arg(long)]
    pub detail: Option<String>,

    /// Color theme: default, dark, monochrome, ocean
    #[arg(long)]
    pub theme: Option<String>,

    /// Diagram direction: right, down, left, up
    #[arg(long)]
    pub direction: Option<String>,

    /// Collect Tailscale status from a saved JSON file instead of the binary
    #[arg(long)]
    pub tailscale_json: Option<String>,

    /// Render to an image with the d2 binary after generating
    #[arg(long)]
    pub render: bool,

    /// Image format for --render: svg or png
    #[arg(long)]
    pub format: Option<String>,
}

pub fn run(config_path: Option<&Path>, args: &GenerateArgs) -> Result<(), String> {
    let mut cfg = load_config(config_path, false)?;
    apply_overrides(&mut cfg, args)?;

    println!("Collecting infrastructure data...");

    let (outcomes, result) = collector::collect(&cfg);
    for outcome in &outcomes {
        match &outcome.status {
            CollectorStatus::Skipped => println!("  - {} (skipped)", outcome.name),
            CollectorStatus::Completed => println!("  ✓ {}", outcome.name),
            CollectorStatus::Failed(message) => eprintln!("  ✗ {message}"),
        }
    }

    let infra = result.map_err(|e| e.to_string())?;

    let d2 = render::render_d2(&infra, &cfg);
    std::fs::write(&cfg.output, &d2)
        .map_err(|e| format!("failed to write {}: {e}", cfg.output))?;

    println!(
        "Generated {} ({} servers, {} services)",
        cfg.output,
        infra.servers.len(),
        infra.service_count()
    );

    if cfg.render.auto_render {
        let image = render_image(Path::new(&cfg.output), &cfg.render.format, &cfg.layout)?;
        println!("Rendered {}", image.display());
    }

    Ok(())
}

fn apply_overrides(cfg: &mut Config, args: &GenerateArgs) -> Result<(), String> {
    if let Some(output) = &args.output {
        cfg.output = output.clone();
    }
    if let Some(detail) = &args.detail {
        cfg.render.detail_level = detail.parse()?;
    }
    if let Some(theme) = &args.theme {
        cfg.theme = theme.clone();
    }
    if let Some(direction) = &args.direction {
        cfg.direction = direction.clone();
    }
    if let Some(json_file) = &args.tailscale_json {
        enable_tailscale(cfg, json_file);
    }
    if args.render {
        cfg.render.auto_render = true;
    }
    if let Some(format) = &args.format {
        cfg.render.format = format.clone();
    }
    Ok(())
}

/// Force the tailscale source on, reading from a saved JSON file.
fn enable_tailscale(cfg: &mut Config, json_file: &str) {
    use serde_yaml::{Mapping, Value};

    if !cfg.sources.is_mapping() {
        cfg.sources = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(sources) = &mut cfg.sources {
        let mut section = Mapping::new();
        section.insert("enabled".into(), Value::Bool(true));
        section.insert("json_file".into(), Value::String(json_file.to_string()));
        sources.insert("tailscale".into(), Value::Mapping(section));
    }
}

/// Hand the generated file to the external `d2` binary.
fn render_image(d2_file: &Path, format: &str, layout: &str) -> Result<PathBuf, String> {
    if !util::binary_on_path("d2") {
        return Err(
            "d2 not found in PATH — install it from https://d2lang.com/tour/install".to_string(),
        );
    }

    let format = if format.is_empty() { "svg" } else { format };
    let out = d2_file.with_extension(format);

    let status = Command::new("d2")
        .arg(format!("--layout={layout}"))
        .arg(d2_file)
        .arg(&out)
        .status()
        .map_err(|e| format!("d2: {e}"))?;
    if !status.success() {
        return Err(format!("d2 render failed ({status})"));
    }

    Ok(out)
}
