//! roster-store — Durable state for the attendance core.
//!
//! Two independent SQLite-backed stores, each owning its own connection:
//! [`EmbeddingStore`] (table `identities`) and [`Ledger`] (table `checkins`).
//! They may share one database file. Connections close when the store drops.

pub mod codec;
pub mod embeddings;
pub mod ledger;

pub use embeddings::EmbeddingStore;
pub use ledger::Ledger;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("identity name must not be empty")]
    EmptyName,
    #[error("embedding for '{name}' has dimension {actual}, store expects {expected}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Open (or create) a SQLite database with durable-write pragmas.
///
/// `synchronous = FULL` makes every committed statement durable before
/// `execute` returns.
pub(crate) fn open_connection(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = FULL;
         PRAGMA busy_timeout = 5000;",
    )?;
    tracing::debug!(path = %path.display(), "opened sqlite database");
    Ok(conn)
}
