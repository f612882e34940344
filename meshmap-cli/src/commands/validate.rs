//! `meshmap validate` - pre-flight check of every enabled source. Fail-slow:
//! every problem is reported before the command exits.

use std::path::Path;

use meshmap_core::collector;

use super::load_config;

pub fn run(config_path: Option<&Path>) -> Result<(), String> {
    let cfg = load_config(config_path, true)?;

    println!("Validating configuration...");

    let reports = collector::validate(&cfg);
    if reports.is_empty() {
        println!("No sources are enabled. Add a sources section or run 'meshmap init'.");
        return Ok(());
    }

    let mut passed = 0;
    let mut failed = 0;
    for report in &reports {
        if report.issues.is_empty() {
            println!("  ✓ {}: configuration valid", report.name);
            passed += 1;
        } else {
            for issue in &report.issues {
                println!("  ✗ {}: {}", issue.field, issue.message);
                if !issue.suggestion.is_empty() {
                    println!("      hint: {}", issue.suggestion);
                }
                failed += 1;
            }
        }
    }

    println!();
    println!("{passed} checks passed, {failed} errors");

    if failed > 0 {
        Err(format!("{failed} validation errors"))
    } else {
        Ok(())
    }
}
