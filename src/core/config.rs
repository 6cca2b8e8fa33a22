//! Registry configuration loaded from `<root>/config.toml`.
//!
//! A missing file is not an error: every key has a default, and a file may set any subset.

use crate::core::error::AgroError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_CONFIG_TOML: &str = r#"# agrotrace registry configuration

[registry]
# SQLite file holding every registry table, relative to this directory.
db_name = "registry.db"
# Seconds a writer waits on a locked database before failing.
busy_timeout_secs = 5
# Append one JSON line per brokered operation to broker.events.jsonl.
audit_log = true
# Caller identity used when neither --as nor AGROTRACE_IDENTITY is set.
# default_identity = "farmer-1"
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub db_name: String,
    pub busy_timeout_secs: u64,
    pub audit_log: bool,
    pub default_identity: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            db_name: "registry.db".to_string(),
            busy_timeout_secs: 5,
            audit_log: true,
            default_identity: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    registry: RegistryConfig,
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

pub fn parse_config(content: &str) -> Result<RegistryConfig, AgroError> {
    let file: ConfigFile = toml::from_str(content)?;
    let config = file.registry;
    if config.db_name.trim().is_empty() || config.db_name.contains(['/', '\\']) {
        return Err(AgroError::InvalidInput(format!(
            "db_name must be a bare file name, got '{}'",
            config.db_name
        )));
    }
    Ok(config)
}

pub fn load_config(root: &Path) -> Result<RegistryConfig, AgroError> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(RegistryConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    parse_config(&content)
}

/// Writes the commented default file unless one is already present.
pub fn write_default_config(root: &Path) -> Result<PathBuf, AgroError> {
    let path = config_path(root);
    if !path.exists() {
        fs::create_dir_all(root)?;
        fs::write(&path, DEFAULT_CONFIG_TOML)?;
    }
    Ok(path)
}
