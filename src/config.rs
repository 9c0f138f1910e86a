//! stackref configuration (`<config_dir>/config.toml`)
//!
//! ```toml
//! [store]
//! backend = "sqlite"          # or "directory"
//! path = "~/infra/outputs.db" # defaults to a file under the state dir
//!
//! [resolve]
//! jobs = 8
//! timeout_secs = 30
//! default_env = "prod"
//! ```

use crate::paths;
use anyhow::{Context, Result};
use foreignkey::DEFAULT_JOBS;
use outputs::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackrefConfig {
    /// Where output documents are read from
    #[serde(default)]
    pub store: StoreConfig,

    /// Resolution defaults
    #[serde(default)]
    pub resolve: ResolveConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Store location; `~` and `$VARS` are expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveConfig {
    /// Parallel store lookups (1 = sequential)
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Give up on a resolution pass after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Environment for manifests that set no `metadata.env`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_env: Option<String>,
}

fn default_jobs() -> usize {
    DEFAULT_JOBS
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            timeout_secs: None,
            default_env: None,
        }
    }
}

impl StackrefConfig {
    /// Load the config from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file()?)
    }

    /// Load the config from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.resolve.jobs == 0 {
            anyhow::bail!("resolve.jobs must be at least 1");
        }
        if self.resolve.timeout_secs == Some(0) {
            anyhow::bail!("resolve.timeout_secs must be at least 1 (omit it for no timeout)");
        }
        if self
            .resolve
            .default_env
            .as_deref()
            .is_some_and(|e| e.trim().is_empty())
        {
            anyhow::bail!("resolve.default_env cannot be empty");
        }
        if self
            .store
            .path
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            anyhow::bail!("store.path cannot be empty");
        }
        Ok(())
    }

    /// Effective store location: the configured path, else the backend's
    /// default inside the state dir
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(paths::expand(path)),
            None => Ok(self.store.backend.default_location(&paths::state_dir()?)),
        }
    }

    /// Configured pass timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.resolve.timeout_secs.map(Duration::from_secs)
    }
}
