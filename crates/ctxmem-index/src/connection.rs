use crate::schema;
use crate::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// A handle on one project's event log database.
///
/// Holds a single `rusqlite::Connection` in WAL mode: one writer at a time,
/// concurrent readers. Every write-path method on [`EventLog`] opens and
/// commits its own transaction; nothing here suspends while holding a write
/// transaction, per the concurrency model this workspace follows.
pub struct EventLog {
    pub(crate) conn: Connection,
    path: PathBuf,
}

impl EventLog {
    /// Open (creating if necessary) the event log at `path`, running schema
    /// migrations. Migrations are additive and idempotent, so this also
    /// succeeds against an already-migrated database from a newer build.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        schema::init_schema(&conn)?;
        Ok(Self { conn, path })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
