//! # Outputs
//!
//! Persistent stores for the output documents of provisioned resources.
//!
//! This crate provides:
//! - [`Database`]: every document in one SQLite file
//! - [`Directory`]: one JSON file per resource under `<kind>/<env>/<name>.json`
//!
//! Both implement [`foreignkey::OutputStore`] for the resolver, and
//! [`OutputBackend`] for the write side used by provisioning pipelines.
//!
//! ## Example
//!
//! ```no_run
//! use foreignkey::{OutputDocument, ResourceId, ResourceKind};
//! use outputs::{Database, OutputBackend};
//! use std::path::Path;
//!
//! let db = Database::open(Path::new("/var/lib/stackref/outputs.db"))?;
//! let id = ResourceId::new(ResourceKind::AwsIamRole, "prod", "eks-role");
//! db.put(&id, &OutputDocument::new(serde_json::json!({
//!     "status": {"outputs": {"arn": "arn:aws:iam::123:role/eks-role"}}
//! })))?;
//!
//! for stored in db.list()? {
//!     println!("{} ({} bytes)", stored.id, stored.size);
//! }
//! # Ok::<(), outputs::Error>(())
//! ```

mod database;
mod directory;
mod error;
mod types;

pub use database::Database;
pub use directory::Directory;
pub use error::{Error, Result};
pub use types::StoredOutput;

use foreignkey::{OutputDocument, OutputStore, ResourceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Read-write access to stored output documents
pub trait OutputBackend: OutputStore {
    /// Store or replace the document of `id`
    fn put(&self, id: &ResourceId, document: &OutputDocument) -> Result<()>;

    /// Read the document of `id` outside a resolution pass
    fn load(&self, id: &ResourceId) -> Result<Option<OutputDocument>>;

    /// Remove the document of `id`; `false` if there was none
    fn delete(&self, id: &ResourceId) -> Result<bool>;

    /// Every stored document, ordered by resource id
    fn list(&self) -> Result<Vec<StoredOutput>>;
}

/// Which backend a store path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Directory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Directory => "directory",
        }
    }

    /// Default location of this backend inside a state directory
    pub fn default_location(&self, state_dir: &Path) -> std::path::PathBuf {
        match self {
            Self::Sqlite => state_dir.join("outputs.db"),
            Self::Directory => state_dir.join("outputs"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(Self::Sqlite),
            "directory" | "dir" => Ok(Self::Directory),
            other => Err(format!("unknown store backend '{other}' (expected sqlite or directory)")),
        }
    }
}

/// Open a backend of the given kind at `path`
pub fn open(kind: BackendKind, path: &Path) -> Result<Box<dyn OutputBackend>> {
    Ok(match kind {
        BackendKind::Sqlite => Box::new(Database::open(path)?),
        BackendKind::Directory => Box::new(Directory::open(path)?),
    })
}
