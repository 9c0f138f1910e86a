//! Directory-backed output store: one JSON file per resource

use crate::types::{StoredOutput, check_id};
use crate::{Error, OutputBackend, Result};
use chrono::{DateTime, Utc};
use foreignkey::{OutputDocument, OutputStore, ResolveContext, ResourceId, ResourceKind, StoreError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Output documents laid out as `<root>/<kind-kebab>/<env>/<name>.json`
///
/// Plain files, so provisioning pipelines can write them with any tool.
#[derive(Debug, Clone)]
pub struct Directory {
    root: PathBuf,
}

impl Directory {
    /// Open a store rooted at `root`, creating it if missing
    pub fn open(root: &Path) -> Result<Self> {
        if root.exists() && !root.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }
        std::fs::create_dir_all(root)?;
        log::debug!("Opening output directory {}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the document of `id`
    pub fn path_for(&self, id: &ResourceId) -> PathBuf {
        self.root
            .join(id.kind.kebab_name())
            .join(&id.env)
            .join(format!("{}.json", id.name))
    }

    /// Parse `<kind>/<env>/<name>.json` relative to the root
    fn id_from_path(&self, path: &Path) -> Result<Option<ResourceId>> {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return Ok(None);
        };
        let parts: Vec<&str> = rel.iter().filter_map(|c| c.to_str()).collect();
        let [kind, env, file] = parts.as_slice() else {
            return Ok(None);
        };
        let Some(name) = file.strip_suffix(".json") else {
            return Ok(None);
        };
        let kind: ResourceKind = kind
            .parse()
            .map_err(|_| Error::UnknownKind((*kind).to_string()))?;
        Ok(Some(ResourceId::new(kind, *env, name)))
    }
}

impl OutputBackend for Directory {
    fn put(&self, id: &ResourceId, document: &OutputDocument) -> Result<()> {
        check_id(id)?;
        let path = self.path_for(id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(document).map_err(|source| Error::Corrupt {
            location: path.display().to_string(),
            source,
        })?;
        std::fs::write(&path, text)?;
        log::debug!("Stored outputs of {id} at {}", path.display());
        Ok(())
    }

    fn load(&self, id: &ResourceId) -> Result<Option<OutputDocument>> {
        check_id(id)?;
        let path = self.path_for(id);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        OutputDocument::from_json(&text)
            .map(Some)
            .map_err(|source| Error::Corrupt {
                location: path.display().to_string(),
                source,
            })
    }

    fn delete(&self, id: &ResourceId) -> Result<bool> {
        check_id(id)?;
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<StoredOutput>> {
        let mut outputs = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(3)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let id = match self.id_from_path(entry.path()) {
                Ok(Some(id)) => id,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Skipping {}: {e}", entry.path().display());
                    continue;
                }
            };
            let meta = entry.metadata().map_err(std::io::Error::from)?;
            let updated_at: DateTime<Utc> = meta
                .modified()
                .map(DateTime::from)
                .unwrap_or_default();
            outputs.push(StoredOutput {
                id,
                updated_at,
                size: meta.len(),
            });
        }
        outputs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(outputs)
    }
}

impl OutputStore for Directory {
    fn get(
        &self,
        id: &ResourceId,
        ctx: &ResolveContext,
    ) -> std::result::Result<Option<OutputDocument>, StoreError> {
        ctx.check()?;
        Ok(self.load(id)?)
    }
}
