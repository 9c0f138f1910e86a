use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::StackrefConfig;
use crate::paths::{self, Location};
use crate::ui;

pub fn run(_ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(),
        ConfigCommand::Validate => validate(),
    }
}

fn show() -> Result<()> {
    ui::header("Configuration");

    let (config_dir, config_origin) = Location::Config.resolve()?;
    let (state_dir, state_origin) = Location::State.resolve()?;
    let file = config_dir.join("config.toml");
    let config = StackrefConfig::load_from(&file)?;

    let location = if file.exists() {
        file.display().to_string()
    } else {
        format!("{} (not found, using defaults)", file.display())
    };
    ui::kv("Config file", &location);
    ui::kv("Config directory", &format!("{} ({config_origin})", config_dir.display()));
    ui::kv("State directory", &format!("{} ({state_origin})", state_dir.display()));

    ui::section("Store");
    ui::kv("Backend", config.store.backend.as_str());
    ui::kv("Path", &config.store_path()?.display().to_string());

    ui::section("Resolve");
    ui::kv("Jobs", &config.resolve.jobs.to_string());
    ui::kv(
        "Timeout",
        &config
            .resolve
            .timeout_secs
            .map_or_else(|| "none".to_string(), |s| format!("{s}s")),
    );
    ui::kv(
        "Default env",
        config.resolve.default_env.as_deref().unwrap_or("(from manifest)"),
    );

    println!();
    ui::dim(&format!(
        "Override locations with {} and {}.",
        paths::ENV_CONFIG_DIR,
        paths::ENV_STATE_DIR
    ));
    Ok(())
}

fn validate() -> Result<()> {
    let file = paths::config_file()?;
    if !file.exists() {
        ui::info(&format!("No config at {}, defaults apply", file.display()));
        return Ok(());
    }

    let config = StackrefConfig::load_from(&file)?;
    match config.validate() {
        Ok(()) => {
            ui::success(&format!("{} is valid", file.display()));
            Ok(())
        }
        Err(e) => {
            ui::error(&format!("{}: {e}", file.display()));
            anyhow::bail!("Configuration is invalid")
        }
    }
}
