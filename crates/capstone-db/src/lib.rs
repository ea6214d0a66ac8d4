//! # capstone-db
//!
//! libSQL persistence and the workflow service for Capstone.
//!
//! Holds all relational state: actors, invitations, teams and rosters,
//! project requests with their revision history, artifacts and the audit
//! trail. [`service::CapstoneService`] runs every operation as one immediate
//! transaction on its own connection, under the key-partitioned sections of
//! [`locks::KeyedLocks`].

pub mod directory;
pub mod error;
pub mod helpers;
pub mod locks;
mod migrations;
pub mod notify;
pub mod repos;
pub mod service;
pub mod sweep;

#[cfg(test)]
mod test_support;

use error::DatabaseError;
use libsql::Builder;

/// Handle to the local database file.
///
/// Hands out one connection per operation so concurrent operations never
/// share a transaction. The database must be file-backed: every
/// `:memory:` connection would see its own empty database.
pub struct CapstoneDb {
    db: libsql::Database,
    path: String,
    busy_timeout_ms: u64,
}

impl CapstoneDb {
    /// Open a local database at the given path, creating parent directories.
    ///
    /// Switches the file to WAL and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str, busy_timeout_ms: u64) -> Result<Self, DatabaseError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Other(e.into()))?;
            }
        }

        let db = Builder::new_local(path).build().await?;
        let capstone_db = Self {
            db,
            path: path.to_string(),
            busy_timeout_ms,
        };

        let conn = capstone_db.connect().await?;
        let mut rows = conn
            .query("PRAGMA journal_mode = WAL", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA journal_mode: {e}")))?;
        while rows.next().await?.is_some() {}
        migrations::run_migrations(&conn).await?;

        tracing::debug!(path, "database opened");
        Ok(capstone_db)
    }

    /// Open a fresh connection with per-connection pragmas applied.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the connection or a pragma fails.
    pub async fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        // busy_timeout returns a row, so it goes through query().
        let mut rows = conn
            .query(&format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms), ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA busy_timeout: {e}")))?;
        while rows.next().await?.is_some() {}

        Ok(conn)
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Generate a prefixed ID on a throwaway connection.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let conn = self.connect().await?;
        helpers::generate_id(&conn, prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn test_db() -> (CapstoneDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capstone.db");
        let db = CapstoneDb::open_local(path.to_str().unwrap(), 5000)
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let (db, _dir) = test_db().await;
        let conn = db.connect().await.unwrap();

        let tables = [
            "actors",
            "teams",
            "team_members",
            "invitations",
            "project_requests",
            "request_revisions",
            "artifacts",
            "audit_trail",
        ];
        for table in &tables {
            let mut rows = conn
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap();
            assert!(row.is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn open_local_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".capstone").join("capstone.db");
        CapstoneDb::open_local(path.to_str().unwrap(), 100)
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn generate_id_correct_format() {
        let (db, _dir) = test_db().await;
        let id = db.generate_id("tem").await.unwrap();
        assert!(id.starts_with("tem-"), "ID should start with 'tem-': {id}");
        assert_eq!(id.len(), 12, "3 prefix + 1 dash + 8 hex: {id}");
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn generate_id_all_prefixes() {
        let (db, _dir) = test_db().await;
        for prefix in capstone_core::ids::ALL_PREFIXES {
            let id = db.generate_id(prefix).await.unwrap();
            assert!(id.starts_with(&format!("{prefix}-")));
        }
    }

    #[tokio::test]
    async fn generate_id_uniqueness() {
        let (db, _dir) = test_db().await;
        let conn = db.connect().await.unwrap();
        let mut ids = HashSet::new();
        for _ in 0..100 {
            let id = helpers::generate_id(&conn, "tst").await.unwrap();
            assert!(ids.insert(id.clone()), "Duplicate ID generated: {id}");
        }
    }

    #[tokio::test]
    async fn idempotent_migrations() {
        let (db, _dir) = test_db().await;
        let conn = db.connect().await.unwrap();
        migrations::run_migrations(&conn).await.unwrap();
    }

    #[tokio::test]
    async fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capstone.db");
        let path = path.to_str().unwrap();
        {
            let db = CapstoneDb::open_local(path, 5000).await.unwrap();
            db.connect()
                .await
                .unwrap()
                .execute(
                    "INSERT INTO actors (id, role, created_at) VALUES ('alice', 'student', '2026-01-01T00:00:00+00:00')",
                    (),
                )
                .await
                .unwrap();
        }
        let db = CapstoneDb::open_local(path, 5000).await.unwrap();
        let mut rows = db
            .connect()
            .await
            .unwrap()
            .query("SELECT role FROM actors WHERE id = 'alice'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "student");
    }
}
