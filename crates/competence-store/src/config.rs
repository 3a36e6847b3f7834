//! Store and service configuration, and the store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use competence_core::engine::CompetenceServiceConfig;
use competence_core::traits::CompetenceStore;

use crate::file::JsonFileStore;
use crate::memory::InMemoryStore;

/// Which persistence backend to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Records live only as long as the process.
    Memory,
    /// One JSON document per learner under `path`.
    File {
        #[serde(default = "default_data_dir")]
        path: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./competence-data")
}

/// Update service tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Re-apply attempts after a save conflict.
    #[serde(default = "default_retries")]
    pub max_conflict_retries: u32,
    /// Initial delay between re-apply attempts in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_retries() -> u32 {
    5
}
fn default_retry_delay() -> u64 {
    10
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            max_conflict_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl From<&ServiceSection> for CompetenceServiceConfig {
    fn from(section: &ServiceSection) -> Self {
        CompetenceServiceConfig {
            max_conflict_retries: section.max_conflict_retries,
            retry_delay: Duration::from_millis(section.retry_delay_ms),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetenceConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub service: ServiceSection,
}

impl CompetenceConfig {
    pub fn service_config(&self) -> CompetenceServiceConfig {
        CompetenceServiceConfig::from(&self.service)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `competence.toml` in the current directory
/// 2. `~/.config/competence/config.toml`
///
/// Environment variable override: `COMPETENCE_DATA_DIR` selects the file
/// backend rooted at that directory.
pub fn load_config() -> Result<CompetenceConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<CompetenceConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("competence.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CompetenceConfig::default(),
    };

    if let Ok(dir) = std::env::var("COMPETENCE_DATA_DIR") {
        config.store = StoreConfig::File {
            path: PathBuf::from(dir),
        };
    }

    Ok(config)
}

/// Parse a TOML document and resolve `${VAR}` references in the store path.
pub fn parse_config(content: &str) -> Result<CompetenceConfig> {
    let mut config: CompetenceConfig = toml::from_str(content)?;
    if let StoreConfig::File { path } = &mut config.store {
        *path = PathBuf::from(resolve_env_vars(&path.to_string_lossy()));
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("competence"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Arc<dyn CompetenceStore> {
    match config {
        StoreConfig::Memory => Arc::new(InMemoryStore::new()),
        StoreConfig::File { path } => {
            tracing::debug!(path = %path.display(), "using JSON file store");
            Arc::new(JsonFileStore::new(path.clone()))
        }
    }
}
