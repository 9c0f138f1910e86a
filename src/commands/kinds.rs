//! `stackref kinds`: list resource kinds by provider

use crate::catalog::CatalogManifest;
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use foreignkey::{Provider, ResourceKind};

pub fn run(provider: Option<Provider>, catalog_only: bool) -> Result<()> {
    let groups = grouped(provider, catalog_only);
    if groups.is_empty() {
        ui::info("No matching kinds");
        return Ok(());
    }

    for (provider, kinds) in &groups {
        ui::section(provider.as_str());
        for kind in kinds {
            let marker = if CatalogManifest::is_supported(*kind) {
                "manifest".green().to_string()
            } else {
                String::new()
            };
            let kebab = format!("{:<36}", kind.kebab_name());
            println!(
                "  {:>4}  {:<32} {} {}",
                kind.id(),
                kind.as_str(),
                kebab.dimmed(),
                marker
            );
        }
    }
    Ok(())
}

/// Kinds grouped by provider, in provider then id order
fn grouped(provider: Option<Provider>, catalog_only: bool) -> Vec<(Provider, Vec<ResourceKind>)> {
    Provider::ALL
        .into_iter()
        .filter(|p| provider.is_none_or(|wanted| wanted == *p))
        .map(|p| {
            let kinds: Vec<ResourceKind> = ResourceKind::for_provider(p)
                .filter(|k| !catalog_only || CatalogManifest::is_supported(*k))
                .collect();
            (p, kinds)
        })
        .filter(|(_, kinds)| !kinds.is_empty())
        .collect()
}
