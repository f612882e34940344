pub mod generate;
pub mod init;
pub mod validate;

use std::path::Path;

use meshmap_core::config::{Config, ConfigError};

/// Load the config from an explicit path, or discover it from the working
/// directory. Without `require_file`, a missing config falls back to
/// defaults so flag-only invocations still work.
pub fn load_config(path: Option<&Path>, require_file: bool) -> Result<Config, String> {
    if let Some(path) = path {
        return Config::load(path).map_err(|e| format!("failed to load {}: {e}", path.display()));
    }

    let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
    match Config::discover(&cwd) {
        Ok((found, cfg)) => {
            tracing::debug!(path = %found.display(), "loaded config");
            Ok(cfg)
        }
        Err(ConfigError::NotFound { .. }) if !require_file => Ok(Config::default()),
        Err(ConfigError::NotFound { .. }) => {
            Err("no config file found, run 'meshmap init' to create one".to_string())
        }
        Err(e) => Err(e.to_string()),
    }
}
