//! Store handle for an agrotrace registry workspace.
//!
//! A store is the `.agrotrace/` directory: the registry database, the broker audit log and
//! the optional `config.toml` all live directly under its root.

use crate::core::config::{self, RegistryConfig};
use crate::core::error::AgroError;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name marking a registry workspace.
pub const STORE_DIR_NAME: &str = ".agrotrace";

#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory
    pub root: PathBuf,
    pub config: RegistryConfig,
}

impl Store {
    /// Store with default configuration; nothing is read from disk.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            config: RegistryConfig::default(),
        }
    }

    /// Creates the root directory if needed and loads `config.toml` from it.
    pub fn open(root: &Path) -> Result<Self, AgroError> {
        fs::create_dir_all(root)?;
        let config = config::load_config(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(&self.config.db_name)
    }
}

/// Walks up from `start_dir` to the nearest directory containing `.agrotrace/`.
pub fn find_store_root(start_dir: &Path) -> Result<PathBuf, AgroError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        let candidate = current_dir.join(STORE_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if !current_dir.pop() {
            return Err(AgroError::NotFound(
                "'.agrotrace' directory not found in current or parent directories. Run `agrotrace init` first.".to_string(),
            ));
        }
    }
}
