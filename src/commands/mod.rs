pub mod config;
pub mod kinds;
pub mod outputs;
pub mod refs;
pub mod resolve;

use crate::cli::StoreArgs;
use crate::config::StackrefConfig;
use crate::paths;
use anyhow::{Context as _, Result};
use ::outputs::OutputBackend;

/// Load and validate the config file
pub(crate) fn load_config() -> Result<StackrefConfig> {
    let config = StackrefConfig::load()?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Open the output store selected by flags, falling back to the config
pub(crate) fn open_store(config: &StackrefConfig, args: &StoreArgs) -> Result<Box<dyn OutputBackend>> {
    let backend = args.backend.unwrap_or(config.store.backend);
    let path = match (&args.store, &config.store.path) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => paths::expand(path),
        (None, None) => backend.default_location(&paths::state_dir()?),
    };
    log::info!("Using {} output store at {}", backend, path.display());
    ::outputs::open(backend, &path)
        .with_context(|| format!("Could not open {} output store at {}", backend, path.display()))
}
