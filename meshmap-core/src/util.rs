//! Small shared helpers: D2 identifier sanitizing, template stripping,
//! path expansion, and lenient YAML scalar coercion.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_yaml::Value;

fn non_id_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9_-]").unwrap())
}

/// Convert a string into a valid D2 identifier.
/// D2 identifiers must be alphanumeric with hyphens/underscores.
pub fn sanitize_id(s: &str) -> String {
    let lowered = s.to_lowercase().replace([' ', '.', '/'], "-");
    let cleaned = non_id_chars().replace_all(&lowered, "").into_owned();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Wrap a string in double quotes for D2 labels.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

fn template_expr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{[^}]*\}\}").unwrap())
}

/// Replace `{{ var }}` template expressions with an inert placeholder so the
/// file can be handed to a standard YAML parser.
pub fn strip_templates(content: &str) -> String {
    template_expr().replace_all(content, "PLACEHOLDER").into_owned()
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Coerce a YAML scalar to an integer. YAML decoders hand back integers or
/// floats depending on how the value was written; both are accepted here.
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// Check whether an executable is available on PATH.
pub fn binary_on_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(name).is_file())
}
