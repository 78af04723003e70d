//! Configuration management for bw-ssh
//!
//! Read from `~/.config/bw-ssh/config.json`. Every field is optional; a
//! missing file yields the defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::paths::Paths;

/// bw-ssh configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Vault folder holding the SSH items
    #[serde(default = "default_folder")]
    pub folder: String,

    /// Vault CLI executable
    #[serde(default = "default_vault_program")]
    pub vault_program: String,

    /// Agent registration executable
    #[serde(default = "default_agent_program")]
    pub agent_program: String,

    /// SSH configuration root, `~/.ssh` when unset
    #[serde(default)]
    pub ssh_root: Option<String>,
}

fn default_folder() -> String {
    "ssh".to_string()
}

fn default_vault_program() -> String {
    "bw".to_string()
}

fn default_agent_program() -> String {
    "ssh-add".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            folder: default_folder(),
            vault_program: default_vault_program(),
            agent_program: default_agent_program(),
            ssh_root: None,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))
        } else {
            Ok(Self::default())
        }
    }

    /// Apply the configured SSH root to a set of paths
    pub fn apply(&self, paths: Paths) -> Paths {
        match &self.ssh_root {
            Some(root) => paths.with_ssh_root(root),
            None => paths,
        }
    }
}
