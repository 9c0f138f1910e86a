mod catalog;
mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use foreignkey::AssembleError;
use std::io;

/// Exit status for internal errors (sysexits `EX_SOFTWARE`)
const EX_SOFTWARE: i32 = 70;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if let Err(err) = run(&ctx, cli.command) {
        ui::error(&format!("{err:#}"));
        std::process::exit(exit_code(&err));
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    log::trace!("Running with verbosity {}", ctx.verbose);
    match command {
        Command::Resolve(args) => commands::resolve::run(ctx, args),
        Command::Refs { manifest } => commands::refs::run(ctx, &manifest),
        Command::Outputs(cmd) => commands::outputs::run(ctx, cmd),
        Command::Kinds { provider, catalog } => commands::kinds::run(provider, catalog),
        Command::Config(cmd) => commands::config::run(ctx, cmd),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "stackref", &mut io::stdout());
            Ok(())
        }
    }
}

/// A reference surviving resolution is a bug, not a user error
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AssembleError>() {
        Some(AssembleError::InvariantViolation { .. }) => EX_SOFTWARE,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;

    #[test]
    fn test_exit_codes() {
        let violation = anyhow::Error::new(AssembleError::InvariantViolation {
            paths: vec!["spec.cluster_role_arn".to_string()],
        });
        assert_eq!(exit_code(&violation), EX_SOFTWARE);

        let wrapped: Result<()> = Err(AssembleError::InvariantViolation { paths: vec![] })
            .context("Assembling stack input");
        assert_eq!(exit_code(&wrapped.unwrap_err()), EX_SOFTWARE);

        assert_eq!(exit_code(&anyhow::anyhow!("manifest not found")), 1);
    }
}
