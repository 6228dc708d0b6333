//! Name → embedding registry, persisted in the `identities` table and
//! mirrored fully in memory for matching.

use crate::{codec, open_connection, StoreError};
use roster_core::{is_blank, Embedding, Identity};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;

/// Persisted mapping from identity name to a single embedding.
///
/// Writes go to disk first and to the in-memory copy only after the row is
/// committed, so a failed `put` leaves both unchanged.
pub struct EmbeddingStore {
    conn: Connection,
    dim: usize,
    cache: BTreeMap<String, Embedding>,
}

impl EmbeddingStore {
    /// Open (or create) the store at `path`, loading every identity.
    ///
    /// Fails if any stored embedding is not exactly `dim` values long.
    pub fn open(path: impl AsRef<Path>, dim: usize) -> Result<Self, StoreError> {
        Self::from_connection(open_connection(path.as_ref())?, dim)
    }

    /// Non-durable store, for tests and dry runs.
    pub fn open_in_memory(dim: usize) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, dim)
    }

    fn from_connection(conn: Connection, dim: usize) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS identities (
                name     TEXT PRIMARY KEY,
                encoding BLOB NOT NULL
            )",
            [],
        )?;

        let mut store = Self {
            conn,
            dim,
            cache: BTreeMap::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Embedding dimension this store accepts.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Re-read all identities from disk, replacing the in-memory copy.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare("SELECT name, encoding FROM identities")?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((name, blob))
        })?;

        let mut loaded = BTreeMap::new();
        for row in rows {
            let (name, blob) = row?;
            let embedding = codec::decode(&blob, self.dim).map_err(|actual| {
                StoreError::DimensionMismatch {
                    name: name.clone(),
                    expected: self.dim,
                    actual,
                }
            })?;
            loaded.insert(name, embedding);
        }

        tracing::debug!(count = loaded.len(), "loaded identities");
        self.cache = loaded;
        Ok(())
    }

    /// Store `embedding` under `name`, replacing any previous embedding.
    ///
    /// Durable on return. Overwriting is not an error.
    pub fn put(&mut self, name: &str, embedding: Embedding) -> Result<(), StoreError> {
        if is_blank(name) {
            return Err(StoreError::EmptyName);
        }
        if embedding.dim() != self.dim {
            return Err(StoreError::DimensionMismatch {
                name: name.to_string(),
                expected: self.dim,
                actual: embedding.dim(),
            });
        }

        self.conn.execute(
            "INSERT OR REPLACE INTO identities (name, encoding) VALUES (?1, ?2)",
            params![name, codec::encode(&embedding)],
        )?;

        let replaced = self.cache.insert(name.to_string(), embedding).is_some();
        tracing::debug!(name, replaced, "identity stored");
        Ok(())
    }

    /// Embedding for `name`, or `None` if not enrolled.
    pub fn get(&self, name: &str) -> Option<&Embedding> {
        self.cache.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// All `(name, embedding)` pairs. Order is unspecified.
    pub fn all(&self) -> impl Iterator<Item = (&str, &Embedding)> + '_ {
        self.cache.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Owned copies of every identity.
    pub fn identities(&self) -> Vec<Identity> {
        self.cache
            .iter()
            .map(|(name, embedding)| Identity {
                name: name.clone(),
                embedding: embedding.clone(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.cache.keys().cloned().collect()
    }

    /// Delete `name`. Returns whether it existed. Ledger rows are untouched.
    pub fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM identities WHERE name = ?1", params![name])?;
        self.cache.remove(name);
        Ok(deleted > 0)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
