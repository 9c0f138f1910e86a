//! Where stackref keeps its config file and its output store
//!
//! Each directory is looked up in order, skipping unset or empty variables:
//!
//! | Directory | Override              | XDG base          | Platform default                         |
//! |-----------|-----------------------|-------------------|------------------------------------------|
//! | config    | `STACKREF_CONFIG_DIR` | `XDG_CONFIG_HOME` | `~/.config/stackref`, `%APPDATA%`        |
//! | state     | `STACKREF_STATE_DIR`  | `XDG_STATE_HOME`  | `~/.local/state/stackref`, `%LOCALAPPDATA%` |
//!
//! Overrides may use `~` and `$VARS`; XDG bases get `stackref` appended.

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;

const APP_DIR: &str = "stackref";

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "STACKREF_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "STACKREF_STATE_DIR";

/// A directory stackref owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Holds `config.toml`
    Config,
    /// Holds the default output store
    State,
}

/// How a [`Location`] was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Taken from this environment variable
    Env(&'static str),
    Platform,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Config => "config",
            Self::State => "state",
        })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(var) => write!(f, "from {var}"),
            Self::Platform => f.write_str("platform default"),
        }
    }
}

impl Location {
    const fn override_var(self) -> &'static str {
        match self {
            Self::Config => ENV_CONFIG_DIR,
            Self::State => ENV_STATE_DIR,
        }
    }

    const fn xdg_var(self) -> &'static str {
        match self {
            Self::Config => "XDG_CONFIG_HOME",
            Self::State => "XDG_STATE_HOME",
        }
    }

    fn platform_base(self) -> Option<PathBuf> {
        if cfg!(windows) {
            match self {
                Self::Config => dirs::config_dir(),
                Self::State => dirs::data_local_dir(),
            }
        } else {
            let home = dirs::home_dir()?;
            Some(match self {
                Self::Config => home.join(".config"),
                Self::State => home.join(".local").join("state"),
            })
        }
    }

    /// Find the directory and report where it came from
    pub fn resolve(self) -> Result<(PathBuf, Origin)> {
        let found = if let Some(dir) = env_value(self.override_var()) {
            (expand(&dir), Origin::Env(self.override_var()))
        } else if let Some(base) = env_value(self.xdg_var()) {
            (PathBuf::from(base).join(APP_DIR), Origin::Env(self.xdg_var()))
        } else {
            let base = self
                .platform_base()
                .with_context(|| format!("Could not determine the {self} directory"))?;
            (base.join(APP_DIR), Origin::Platform)
        };
        log::debug!("Using {self} dir {} ({})", found.0.display(), found.1);
        Ok(found)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(Location::Config.resolve()?.0)
}

pub fn state_dir() -> Result<PathBuf> {
    Ok(Location::State.resolve()?.0)
}

/// Path of the main config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Expand `~` and environment variables, keeping the input when a
/// variable is undefined
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
