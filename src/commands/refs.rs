//! `stackref refs`: list reference fields without resolving them

use crate::Context;
use crate::catalog::{CatalogManifest, Manifest, ManifestVisitor, Spec};
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use foreignkey::{Address, walk_refs};
use std::path::Path;

pub fn run(_ctx: &Context, manifest_path: &Path) -> Result<()> {
    let config = super::load_config()?;
    let manifest = CatalogManifest::load(manifest_path)?;

    let env = Some(manifest.metadata().env.clone())
        .filter(|e| !e.is_empty())
        .or(config.resolve.default_env);

    ui::header(&format!(
        "{} '{}' ({})",
        manifest.kind(),
        manifest.metadata().name,
        env.as_deref().unwrap_or("no env")
    ));

    let rows = manifest.accept(ListRefs { env: env.as_deref() });
    if rows.is_empty() {
        ui::dim("No reference fields set");
        return Ok(());
    }

    let width = rows.iter().map(|r| r.path.len()).max().unwrap_or(0);
    let mut pending = 0;
    for row in &rows {
        let target = match &row.target {
            RefTarget::Literal => "literal".dimmed().to_string(),
            RefTarget::Address(address) => {
                pending += 1;
                format!("{} {}", "→".cyan(), address)
            }
            RefTarget::Incomplete { reference, reason } => {
                pending += 1;
                format!("{} {} ({})", "⚠".yellow(), reference, reason)
            }
        };
        let type_name = format!("{:<7}", row.type_name);
        println!("  {:<width$}  {}  {}", row.path, type_name.dimmed(), target);
    }

    println!();
    ui::info(&format!(
        "{} field(s), {} reference(s) to resolve",
        rows.len(),
        pending
    ));
    Ok(())
}

/// One value-or-ref field of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
struct RefRow {
    path: String,
    type_name: &'static str,
    target: RefTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RefTarget {
    Literal,
    Address(Address),
    /// Defaults could not complete the reference
    Incomplete { reference: String, reason: String },
}

struct ListRefs<'a> {
    env: Option<&'a str>,
}

impl ManifestVisitor for ListRefs<'_> {
    type Output = Vec<RefRow>;

    fn visit<S: Spec>(self, mut manifest: Manifest<S>) -> Vec<RefRow> {
        walk_refs(&mut manifest)
            .map(|slot| {
                let target = match slot.reference() {
                    None => RefTarget::Literal,
                    Some(reference) => match reference.address(slot.defaults(), self.env) {
                        Ok(address) => RefTarget::Address(address),
                        Err(reason) => RefTarget::Incomplete {
                            reference: reference.to_string(),
                            reason,
                        },
                    },
                };
                RefRow {
                    path: slot.path().to_string(),
                    type_name: slot.type_name(),
                    target,
                }
            })
            .collect()
    }
}
