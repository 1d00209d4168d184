//! Facade configuration (`plq.toml`)
//!
//! Resolution order for [`discover`]:
//! 1. `PLQ_CONFIG` env var
//! 2. `./plq.toml`
//! 3. `<config dir>/plq/config.toml`
//! 4. built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostics::DEFAULT_HISTORY;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV_VAR: &str = "PLQ_CONFIG";

/// Config file name looked up in the working directory
pub const CONFIG_FILE: &str = "plq.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacadeConfig {
    #[serde(default)]
    pub executor: ExecutorSection,
    #[serde(default)]
    pub query: QuerySection,
    #[serde(default)]
    pub diagnostics: DiagnosticsSection,
}

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorSection {
    /// Worker threads (absent or 0 = one per core)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_thread_name() -> String {
    "plq-worker".to_string()
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            threads: None,
            thread_name: default_thread_name(),
        }
    }
}

/// Per-query guards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySection {
    /// Abort a query after this many solutions (absent = unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSection {
    /// Fault records kept in memory
    #[serde(default = "default_history")]
    pub history: usize,
}

fn default_history() -> usize {
    DEFAULT_HISTORY
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            history: default_history(),
        }
    }
}

/// Load config from `path`.
///
/// Returns default config if the file doesn't exist.
pub fn load(path: &Path) -> Result<FacadeConfig> {
    if !path.exists() {
        return Ok(FacadeConfig::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;

    toml::from_str(&contents).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Save config to `path`, creating parent directories.
pub fn save(path: &Path, config: &FacadeConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, contents).with_context(|| format!("Failed to write config: {}", path.display()))
}

/// User-level config path (`~/.config/plq/config.toml` on Linux)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("plq").join("config.toml"))
}

/// First config file that exists, following the resolution order.
pub fn locate() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    user_config_path().filter(|p| p.exists())
}

/// Load whichever config [`locate`] finds, or defaults.
pub fn discover() -> Result<FacadeConfig> {
    match locate() {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load(&path)
        }
        None => Ok(FacadeConfig::default()),
    }
}
