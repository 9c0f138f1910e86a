//! `stackref outputs`: read and write the output store

use crate::Context;
use crate::cli::{OutputsCommand, ResourceArgs, StoreArgs};
use crate::ui;
use anyhow::{Context as _, Result};
use colored::Colorize;
use foreignkey::{OutputDocument, ResourceId, ResourceKind};
use ::outputs::{OutputBackend, StoredOutput};
use std::io::Read;
use std::path::Path;

pub fn run(ctx: &Context, cmd: OutputsCommand) -> Result<()> {
    match cmd {
        OutputsCommand::Put {
            resource,
            file,
            store,
        } => with_store(&store, |backend| put(ctx, backend, &resource.into(), &file)),
        OutputsCommand::Get {
            resource,
            field,
            store,
        } => with_store(&store, |backend| get(backend, &resource.into(), field.as_deref())),
        OutputsCommand::List { kind, env, store } => {
            with_store(&store, |backend| list(backend, kind, env.as_deref()))
        }
        OutputsCommand::Rm {
            resource,
            yes,
            store,
        } => with_store(&store, |backend| rm(ctx, backend, &resource.into(), yes)),
    }
}

impl From<ResourceArgs> for ResourceId {
    fn from(args: ResourceArgs) -> Self {
        ResourceId::new(args.kind, args.env, args.name)
    }
}

fn with_store<T>(args: &StoreArgs, f: impl FnOnce(&dyn OutputBackend) -> Result<T>) -> Result<T> {
    let config = super::load_config()?;
    let backend = super::open_store(&config, args)?;
    f(&*backend)
}

fn put(ctx: &Context, backend: &dyn OutputBackend, id: &ResourceId, file: &Path) -> Result<()> {
    let text = if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read document from stdin")?;
        text
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Could not read document: {}", file.display()))?
    };

    let document = parse_document(&text)
        .with_context(|| format!("Invalid output document: {}", file.display()))?;
    backend.put(id, &document)?;

    if !ctx.quiet {
        ui::success(&format!("Stored outputs of {id}"));
    }
    Ok(())
}

/// Parse a JSON or YAML document; the top level must be a map
fn parse_document(text: &str) -> Result<OutputDocument> {
    let value: serde_json::Value = serde_yaml::from_str(text)?;
    if !value.is_object() {
        anyhow::bail!("top level must be a map (found {})", json_type(&value));
    }
    Ok(OutputDocument::new(value))
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a bool",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "a map",
    }
}

fn get(backend: &dyn OutputBackend, id: &ResourceId, field: Option<&str>) -> Result<()> {
    let document = backend
        .load(id)?
        .with_context(|| format!("No outputs stored for {id}"))?;

    match field {
        Some(path) => {
            let value = document
                .extract(path)
                .with_context(|| format!("{id}#{path}"))?;
            println!("{value}");
        }
        None => println!("{}", serde_json::to_string_pretty(document.as_value())?),
    }
    Ok(())
}

fn list(backend: &dyn OutputBackend, kind: Option<ResourceKind>, env: Option<&str>) -> Result<()> {
    let stored = filter(backend.list()?, kind, env);
    if stored.is_empty() {
        ui::info("No output documents stored");
        return Ok(());
    }

    ui::header("Stored outputs");
    let width = stored.iter().map(|s| s.id.to_string().len()).max().unwrap_or(0);
    for output in &stored {
        println!(
            "  {:<width$}  {:>9}  {}",
            output.id.to_string(),
            ui::format_size(output.size),
            output.updated_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    println!();
    ui::dim(&format!("{} document(s)", stored.len()));
    Ok(())
}

fn filter(stored: Vec<StoredOutput>, kind: Option<ResourceKind>, env: Option<&str>) -> Vec<StoredOutput> {
    stored
        .into_iter()
        .filter(|s| kind.is_none_or(|k| s.id.kind == k))
        .filter(|s| env.is_none_or(|e| s.id.env == e))
        .collect()
}

fn rm(ctx: &Context, backend: &dyn OutputBackend, id: &ResourceId, yes: bool) -> Result<()> {
    if backend.load(id)?.is_none() {
        ui::warn(&format!("No outputs stored for {id}"));
        return Ok(());
    }

    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Remove outputs of {id}? References to it will stop resolving"))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if !confirmed {
            ui::info("Cancelled");
            return Ok(());
        }
    }

    if backend.delete(id)? && !ctx.quiet {
        ui::success(&format!("Removed outputs of {id}"));
    }
    Ok(())
}
