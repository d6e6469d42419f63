//! `SQLite`-backed key-value storage.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, trace};

use super::{migrations, KeyValueBackend};
use crate::error::{Error, Result};

/// Durable key-value backend stored in a single `SQLite` file.
#[derive(Debug)]
pub struct SqliteBackend {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// then brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List the stored keys in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_entries ORDER BY key ASC")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl KeyValueBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        trace!("sqlite set {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("bloodbridge-test-{}-{name}", std::process::id()))
            .join("store.db")
    }

    #[test]
    fn test_open_in_memory() {
        let backend = SqliteBackend::open_in_memory();
        assert!(backend.is_ok());
        assert_eq!(backend.unwrap().path(), Path::new(":memory:"));
    }

    #[test]
    fn test_keys_sorted() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.set("b", "2").unwrap();
        backend.set("a", "1").unwrap();
        assert_eq!(backend.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let path = temp_db_path("reopen");
        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend.set("bb_blood_donors", "[]").unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(
            backend.get("bb_blood_donors").unwrap().as_deref(),
            Some("[]")
        );

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let path = temp_db_path("nested");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());

        let backend = SqliteBackend::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(backend.path(), path.as_path());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
