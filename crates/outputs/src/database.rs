//! SQLite-backed output store

use crate::types::{StoredOutput, check_id};
use crate::{Error, OutputBackend, Result};
use chrono::{DateTime, Utc};
use foreignkey::{OutputDocument, OutputStore, ResolveContext, ResourceId, ResourceKind, StoreError};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

/// Output documents in a single SQLite file
///
/// The connection sits behind a mutex so one database can serve
/// concurrent resolver workers.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create an output database at the given path
    ///
    /// Creates the database file and necessary tables if they don't exist.
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        log::debug!("Opening output database {}", db_path.display());
        Self::init(Connection::open(db_path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS outputs (
                kind TEXT NOT NULL,
                env TEXT NOT NULL,
                name TEXT NOT NULL,
                document TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (kind, env, name)
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }
}

impl OutputBackend for Database {
    fn put(&self, id: &ResourceId, document: &OutputDocument) -> Result<()> {
        check_id(id)?;
        let now = Utc::now().timestamp();
        self.conn()?.execute(
            "INSERT INTO outputs (kind, env, name, document, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(kind, env, name) DO UPDATE SET
                document = excluded.document,
                updated_at = excluded.updated_at",
            params![id.kind.as_str(), id.env, id.name, document.to_json(), now],
        )?;
        log::debug!("Stored outputs of {id}");
        Ok(())
    }

    fn load(&self, id: &ResourceId) -> Result<Option<OutputDocument>> {
        let text: Option<String> = self
            .conn()?
            .query_row(
                "SELECT document FROM outputs WHERE kind = ?1 AND env = ?2 AND name = ?3",
                params![id.kind.as_str(), id.env, id.name],
                |row| row.get(0),
            )
            .optional()?;

        text.map(|t| {
            OutputDocument::from_json(&t).map_err(|source| Error::Corrupt {
                location: id.to_string(),
                source,
            })
        })
        .transpose()
    }

    fn delete(&self, id: &ResourceId) -> Result<bool> {
        let removed = self.conn()?.execute(
            "DELETE FROM outputs WHERE kind = ?1 AND env = ?2 AND name = ?3",
            params![id.kind.as_str(), id.env, id.name],
        )?;
        Ok(removed > 0)
    }

    fn list(&self) -> Result<Vec<StoredOutput>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT kind, env, name, updated_at, length(document)
             FROM outputs ORDER BY kind, env, name",
        )?;
        let rows: Vec<(String, String, String, i64, i64)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut outputs = rows
            .into_iter()
            .map(|(kind, env, name, updated_at, size)| {
                let kind: ResourceKind = kind.parse().map_err(|_| Error::UnknownKind(kind))?;
                Ok(StoredOutput {
                    id: ResourceId::new(kind, env, name),
                    updated_at: DateTime::from_timestamp(updated_at, 0).unwrap_or_default(),
                    size: u64::try_from(size).unwrap_or(0),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        // Kind text sorts alphabetically; present in kind order
        outputs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(outputs)
    }
}

impl OutputStore for Database {
    fn get(
        &self,
        id: &ResourceId,
        ctx: &ResolveContext,
    ) -> std::result::Result<Option<OutputDocument>, StoreError> {
        ctx.check()?;
        Ok(self.load(id)?)
    }
}
