//! `stackref resolve`: manifest in, stack input out

use crate::Context;
use crate::catalog::{CatalogManifest, Manifest, ManifestVisitor, Spec};
use crate::cli::{OutputFormat, ResolveArgs};
use crate::config::StackrefConfig;
use crate::progress::ResolveBar;
use crate::ui;
use anyhow::{Context as _, Result};
use colored::Colorize;
use foreignkey::{
    OutputStore, ProviderCredentials, ResolveContext, ResolveError, ResolveOptions, Resolver,
    assemble,
};
use std::path::Path;
use std::time::Duration;

pub fn run(ctx: &Context, args: ResolveArgs) -> Result<()> {
    let config = super::load_config()?;
    let manifest = CatalogManifest::load(&args.manifest)?;
    let credentials = args
        .provider_config
        .as_deref()
        .map(load_credentials)
        .transpose()?;
    let store = super::open_store(&config, &args.store)?;

    let settings = Settings::merge(&config, &args, manifest.metadata().env.as_str())?;
    log::info!(
        "Resolving {} '{}' (jobs: {}, env: {})",
        manifest.kind(),
        manifest.metadata().name,
        settings.jobs,
        settings.env.as_deref().unwrap_or("-")
    );

    let bar = ResolveBar::new(ctx.quiet);
    let document = manifest.accept(ResolveManifest {
        store: &*store,
        settings: &settings,
        credentials,
        progress: &bar,
    });

    let document = match document {
        Ok(document) => document,
        Err(err) => {
            if let Some(resolve_err) = err.downcast_ref::<ResolveError>() {
                log::debug!(
                    "Pass ended with {} resolved, {} failed",
                    bar.resolved(),
                    bar.failed()
                );
                print_report(resolve_err);
                anyhow::bail!(
                    "{} reference(s) in {} could not be resolved",
                    resolve_err.failures().len(),
                    args.manifest.display()
                );
            }
            return Err(err);
        }
    };

    log::info!("Resolved {} reference(s)", bar.resolved());
    print!("{}", render(&document, args.format)?);
    Ok(())
}

/// Effective options after flags, manifest and config are merged
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    jobs: usize,
    env: Option<String>,
    timeout: Option<Duration>,
    reveal_credentials: bool,
}

impl Settings {
    /// Flags win over the manifest, the manifest wins over the config
    fn merge(config: &StackrefConfig, args: &ResolveArgs, manifest_env: &str) -> Result<Self> {
        let jobs = args.jobs.unwrap_or(config.resolve.jobs);
        if jobs == 0 {
            anyhow::bail!("--jobs must be at least 1");
        }
        let timeout = match args.timeout {
            Some(0) => anyhow::bail!("--timeout must be at least 1 second"),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => config.timeout(),
        };
        let env = args
            .env
            .clone()
            .or_else(|| Some(manifest_env.to_string()).filter(|e| !e.is_empty()))
            .or_else(|| config.resolve.default_env.clone());

        Ok(Self {
            jobs,
            env,
            timeout,
            reveal_credentials: args.reveal_credentials,
        })
    }

    fn options(&self) -> ResolveOptions {
        let mut context = ResolveContext::new();
        if let Some(timeout) = self.timeout {
            context = context.with_timeout(timeout);
        }
        let mut options = ResolveOptions::default().jobs(self.jobs).context(context);
        if let Some(env) = &self.env {
            options = options.default_env(env.clone());
        }
        options
    }
}

/// Resolve, assemble and serialize one typed manifest
struct ResolveManifest<'a, St: ?Sized> {
    store: &'a St,
    settings: &'a Settings,
    credentials: Option<ProviderCredentials>,
    progress: &'a ResolveBar,
}

impl<St: OutputStore + ?Sized> ManifestVisitor for ResolveManifest<'_, St> {
    type Output = Result<serde_json::Value>;

    fn visit<S: Spec>(self, manifest: Manifest<S>) -> Self::Output {
        let mut metadata = manifest.resource_metadata();
        if let Some(env) = &self.settings.env {
            metadata.env.clone_from(env);
        }

        let resolver = Resolver::with_options(self.store, self.settings.options());
        let resolved = resolver.resolve_with_progress(manifest, self.progress)?;
        let input = assemble(resolved, self.credentials, metadata)?;

        let input = if self.settings.reveal_credentials {
            input
        } else {
            input.redacted()
        };
        serde_json::to_value(&input).context("Failed to serialize stack input")
    }
}

fn load_credentials(path: &Path) -> Result<ProviderCredentials> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read provider config: {}", path.display()))?;
    // YAML is a superset of JSON, so one parser covers both
    let credentials: ProviderCredentials = serde_yaml::from_str(&text)
        .with_context(|| format!("Invalid provider config: {}", path.display()))?;
    log::debug!("Loaded {credentials}");
    Ok(credentials)
}

fn render(document: &serde_json::Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut text = serde_json::to_string_pretty(document)?;
            text.push('\n');
            Ok(text)
        }
        OutputFormat::Yaml => Ok(serde_yaml::to_string(document)?),
    }
}

/// One line per broken reference, then advice per category
fn print_report(err: &ResolveError) {
    match err {
        ResolveError::Interrupted { reason, .. } => {
            ui::error(&format!("Resolution {reason}"));
        }
        _ => ui::error(&format!(
            "{} reference(s) could not be resolved",
            err.failures().len()
        )),
    }

    for failure in err.failures() {
        eprintln!(
            "  {} {} {}",
            "✗".red(),
            failure.path.bold(),
            format!("[{}]", failure.category()).dimmed()
        );
        eprintln!("      {} {}", "→".dimmed(), failure.target());
        eprintln!("      {}", failure.failure);
    }

    let categories = err.categories();
    if !categories.is_empty() {
        eprintln!();
        for category in categories {
            eprintln!(
                "  {} {}: {}",
                "hint".yellow(),
                category.description(),
                category.advice()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StoreArgs;
    use foreignkey::{MemoryStore, ResourceId, ResourceKind};
    use serde_json::json;
    use std::path::PathBuf;

    const EKS: &str = r#"
apiVersion: aws.project-planton.org/v1
kind: AwsEksCluster
metadata:
  name: main
  env: prod
spec:
  cluster_role_arn:
    value_from:
      name: eks-role
"#;

    fn args() -> ResolveArgs {
        ResolveArgs {
            manifest: PathBuf::from("eks.yaml"),
            jobs: None,
            timeout: None,
            env: None,
            provider_config: None,
            format: OutputFormat::Yaml,
            reveal_credentials: false,
            store: StoreArgs::default(),
        }
    }

    fn settings(env: &str) -> Settings {
        Settings {
            jobs: 1,
            env: Some(env.to_string()),
            timeout: None,
            reveal_credentials: false,
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with(
            ResourceId::new(ResourceKind::AwsIamRole, "prod", "eks-role"),
            json!({"status": {"outputs": {"arn": "arn:aws:iam::123:role/eks-role"}}}),
        )
    }

    #[test]
    fn test_settings_precedence() {
        let mut config = StackrefConfig::default();
        config.resolve.jobs = 6;
        config.resolve.timeout_secs = Some(20);
        config.resolve.default_env = Some("dev".to_string());

        let merged = Settings::merge(&config, &args(), "").unwrap();
        assert_eq!(merged.jobs, 6);
        assert_eq!(merged.env.as_deref(), Some("dev"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(20)));

        let merged = Settings::merge(&config, &args(), "prod").unwrap();
        assert_eq!(merged.env.as_deref(), Some("prod"));

        let mut flags = args();
        flags.jobs = Some(2);
        flags.env = Some("staging".to_string());
        flags.timeout = Some(5);
        let merged = Settings::merge(&config, &flags, "prod").unwrap();
        assert_eq!(merged.jobs, 2);
        assert_eq!(merged.env.as_deref(), Some("staging"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_settings_reject_zero() {
        let config = StackrefConfig::default();
        let mut flags = args();
        flags.jobs = Some(0);
        assert!(Settings::merge(&config, &flags, "").is_err());

        let mut flags = args();
        flags.timeout = Some(0);
        assert!(Settings::merge(&config, &flags, "").is_err());
    }

    #[test]
    fn test_resolve_manifest_produces_stack_input() {
        let store = store();
        let bar = ResolveBar::new(true);
        let settings = settings("prod");
        let credentials = ProviderCredentials::new(foreignkey::Provider::Aws)
            .with("access_key_id", "AKIAEXAMPLE")
            .with("secret_access_key", "s3cr3t");

        let document = CatalogManifest::from_yaml(EKS)
            .unwrap()
            .accept(ResolveManifest {
                store: &store,
                settings: &settings,
                credentials: Some(credentials),
                progress: &bar,
            })
            .unwrap();

        assert_eq!(
            document["target"]["spec"]["cluster_role_arn"],
            json!({"value": "arn:aws:iam::123:role/eks-role"})
        );
        assert_eq!(document["metadata"]["kind"], "AwsEksCluster");
        assert_eq!(document["metadata"]["env"], "prod");
        assert_eq!(document["provider_credentials"]["provider"], "aws");
        assert_eq!(document["provider_credentials"]["secret_access_key"], "********");
        assert!(!document.to_string().contains("s3cr3t"));
        assert_eq!(bar.resolved(), 1);
    }

    #[test]
    fn test_resolve_manifest_reports_failures() {
        let store = MemoryStore::new();
        let bar = ResolveBar::new(true);
        let settings = settings("prod");

        let err = CatalogManifest::from_yaml(EKS)
            .unwrap()
            .accept(ResolveManifest {
                store: &store,
                settings: &settings,
                credentials: None,
                progress: &bar,
            })
            .unwrap_err();

        let resolve_err = err.downcast_ref::<ResolveError>().unwrap();
        assert_eq!(resolve_err.failures().len(), 1);
        assert_eq!(resolve_err.failures()[0].path, "spec.cluster_role_arn");
        assert_eq!(
            resolve_err.failures()[0].target(),
            "AwsIamRole/prod/eks-role#status.outputs.arn"
        );
        assert_eq!(bar.failed(), 1);
    }

    #[test]
    fn test_credentials_for_wrong_provider() {
        let store = store();
        let bar = ResolveBar::new(true);
        let settings = settings("prod");

        let err = CatalogManifest::from_yaml(EKS)
            .unwrap()
            .accept(ResolveManifest {
                store: &store,
                settings: &settings,
                credentials: Some(ProviderCredentials::new(foreignkey::Provider::Gcp)),
                progress: &bar,
            })
            .unwrap_err();
        assert!(err.downcast_ref::<foreignkey::AssembleError>().is_some());
    }

    #[test]
    fn test_load_credentials_yaml_and_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let yaml = tmp.path().join("aws.yaml");
        std::fs::write(&yaml, "provider: aws\naccess_key_id: AKIA\nregion: us-east-1\n").unwrap();
        let json = tmp.path().join("aws.json");
        std::fs::write(&json, r#"{"provider": "aws", "access_key_id": "AKIA"}"#).unwrap();

        assert_eq!(load_credentials(&yaml).unwrap().get("region"), Some("us-east-1"));
        assert_eq!(load_credentials(&json).unwrap().get("access_key_id"), Some("AKIA"));
    }

    #[test]
    fn test_render_formats() {
        let document = json!({"metadata": {"name": "main"}});
        assert_eq!(render(&document, OutputFormat::Yaml).unwrap(), "metadata:\n  name: main\n");
        assert!(render(&document, OutputFormat::Json).unwrap().ends_with("}\n"));
    }
}
