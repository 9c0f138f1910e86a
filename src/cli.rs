use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use foreignkey::{Provider, ResourceKind};
use outputs::BackendKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stackref")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Resolve cross-resource references in cloud resource manifests", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve every reference in a manifest and print the stack input
    Resolve(ResolveArgs),

    /// List the references in a manifest without resolving them
    Refs {
        /// Manifest file (YAML)
        manifest: PathBuf,
    },

    /// Manage stored output documents
    #[command(subcommand)]
    Outputs(OutputsCommand),

    /// List resource kinds
    Kinds {
        /// Only kinds of this provider
        #[arg(short, long)]
        provider: Option<Provider>,

        /// Only kinds that can be resolved from a manifest
        #[arg(long)]
        catalog: bool,
    },

    /// Show or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Resolve
// ============================================================================

#[derive(Args)]
pub struct ResolveArgs {
    /// Manifest file (YAML)
    pub manifest: PathBuf,

    /// Parallel store lookups (1 = sequential)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Environment for references without one (overrides metadata.env)
    #[arg(short, long)]
    pub env: Option<String>,

    /// Provider credentials file (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub provider_config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub format: OutputFormat,

    /// Print credential values instead of masking them
    #[arg(long)]
    pub reveal_credentials: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Output store selection, overriding the config file
#[derive(Args, Clone, Debug, Default)]
pub struct StoreArgs {
    /// Output store location
    #[arg(long, value_name = "PATH", env = "STACKREF_STORE")]
    pub store: Option<PathBuf>,

    /// Output store backend (sqlite or directory)
    #[arg(long)]
    pub backend: Option<BackendKind>,
}

// ============================================================================
// Outputs Commands
// ============================================================================

/// Identity of a stored document
#[derive(Args, Clone, Debug)]
pub struct ResourceArgs {
    /// Resource kind (AwsIamRole, aws-iam-role, ...)
    pub kind: ResourceKind,

    /// Environment the resource is deployed to
    pub env: String,

    /// Resource name
    pub name: String,
}

#[derive(Subcommand)]
pub enum OutputsCommand {
    /// Store the output document of a resource
    Put {
        #[command(flatten)]
        resource: ResourceArgs,

        /// Document file (JSON or YAML); `-` reads stdin
        file: PathBuf,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print the output document of a resource
    Get {
        #[command(flatten)]
        resource: ResourceArgs,

        /// Print only the scalar at this dot-delimited path
        #[arg(long, value_name = "PATH")]
        field: Option<String>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// List stored output documents
    #[command(alias = "ls")]
    List {
        /// Only documents of this kind
        #[arg(short, long)]
        kind: Option<ResourceKind>,

        /// Only documents of this environment
        #[arg(short, long)]
        env: Option<String>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Remove the output document of a resource
    Rm {
        #[command(flatten)]
        resource: ResourceArgs,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        store: StoreArgs,
    },
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show config file location and effective settings
    Show,

    /// Check the config file for errors
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "stackref", "-vv", "resolve", "eks.yaml", "--jobs", "8", "--timeout", "30",
            "--format", "json", "--backend", "directory",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.manifest, PathBuf::from("eks.yaml"));
        assert_eq!(args.jobs, Some(8));
        assert_eq!(args.timeout, Some(30));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.store.backend, Some(BackendKind::Directory));
        assert!(!args.reveal_credentials);
    }

    #[test]
    fn test_parse_outputs_get_with_lenient_kind() {
        let cli = Cli::try_parse_from([
            "stackref", "outputs", "get", "aws-iam-role", "prod", "eks-role", "--field",
            "status.outputs.arn",
        ])
        .unwrap();
        let Command::Outputs(OutputsCommand::Get { resource, field, .. }) = cli.command else {
            panic!("expected outputs get");
        };
        assert_eq!(resource.kind, ResourceKind::AwsIamRole);
        assert_eq!(resource.env, "prod");
        assert_eq!(field.as_deref(), Some("status.outputs.arn"));
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let result = Cli::try_parse_from(["stackref", "outputs", "rm", "Teapot", "prod", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_kinds_provider() {
        let cli = Cli::try_parse_from(["stackref", "kinds", "--provider", "gcp"]).unwrap();
        let Command::Kinds { provider, catalog } = cli.command else {
            panic!("expected kinds");
        };
        assert_eq!(provider, Some(Provider::Gcp));
        assert!(!catalog);
    }
}
