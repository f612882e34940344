//! Configuration file loading. The top-level keys are typed; the `sources`
//! tree stays untyped here, and each collector decodes its own section
//! against its own schema (see the `collector` module).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::DetailLevel;

/// What to show in the rendered diagram.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub show_devices: bool,
    pub show_volumes: bool,
    /// `category` groups a local server's services into category containers.
    pub group_by: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            show_devices: true,
            show_volumes: false,
            group_by: "category".to_string(),
        }
    }
}

/// Diagram output options.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub detail_level: DetailLevel,
    /// Invoke the external `d2` binary after writing the diagram text.
    pub auto_render: bool,
    /// Image format for auto-render: `svg` or `png`.
    pub format: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            detail_level: DetailLevel::Standard,
            auto_render: false,
            format: "svg".to_string(),
        }
    }
}

/// Root configuration file structure.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Output D2 file path.
    pub output: String,
    /// Layout engine passed to `d2` when auto-rendering.
    pub layout: String,
    /// Diagram direction: `right`, `down`, `left`, `up`.
    pub direction: String,
    /// Color theme name.
    pub theme: String,
    pub display: DisplayConfig,
    pub render: RenderConfig,
    /// Raw per-collector sections keyed by collector config key.
    pub sources: serde_yaml::Value,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output: "infrastructure.d2".to_string(),
            layout: "dagre".to_string(),
            direction: "right".to_string(),
            theme: "default".to_string(),
            display: DisplayConfig::default(),
            render: RenderConfig::default(),
            sources: serde_yaml::Value::Null,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("no config file found, searched: {searched:?}")]
    NotFound { searched: Vec<PathBuf> },
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a string (useful for testing).
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Search for a config file in standard locations: `$MESHMAP_CONFIG`,
    /// then `meshmap.yml` variants in the start directory and its parents.
    pub fn discover(start_dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let names = ["meshmap.yml", "meshmap.yaml", ".meshmap.yml", ".meshmap.yaml"];
        let mut searched = Vec::new();

        if let Ok(env_path) = std::env::var("MESHMAP_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok((path.clone(), Self::load(&path)?));
            }
            searched.push(path);
        }

        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &names {
                let path = current.join(name);
                if path.exists() {
                    return Ok((path.clone(), Self::load(&path)?));
                }
                searched.push(path);
            }
            dir = current.parent();
        }

        Err(ConfigError::NotFound { searched })
    }

    /// This collector's raw config section, if present.
    pub fn source_section(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.sources.get(key)
    }
}
