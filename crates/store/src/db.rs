//! SQLite connection pool for the store.
//!
//! A run reads far more than it writes: every scan loads the digest map of
//! one repository, while workers record a digest per processed job. The pool
//! is sized for that mix with [`Database::pool_size`].
//!
//! A read-only database never creates the file, never migrates and refuses
//! writes at the connection level; it backs dry runs.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const MIN_CONNECTIONS: u32 = 2;
const MAX_CONNECTIONS: u32 = 16;

/// How the database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Access {
    /// Create the file if needed and bring the schema up to date.
    #[default]
    ReadWrite,
    /// Open an existing, already migrated file and reject every write.
    ReadOnly,
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    access: Access,
}

impl Database {
    /// Connection count for a run starting `scans_per_second` scans with
    /// `workers` concurrent workers.
    ///
    /// A digest lookup holds its connection only briefly, so one second's
    /// burst of scans plus the workers bounds useful concurrency. SQLite
    /// serialises writers anyway, hence the upper cap.
    pub fn pool_size(scans_per_second: u32, workers: usize) -> u32 {
        let workers = u32::try_from(workers).unwrap_or(u32::MAX);
        scans_per_second.saturating_add(workers).clamp(MIN_CONNECTIONS, MAX_CONNECTIONS)
    }

    /// Open the store database at `path` with at most `max_connections`
    /// pooled connections.
    #[instrument("opening database", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>, access: Access, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(path.as_ref()).foreign_keys(true);
        let options = match access {
            Access::ReadWrite => options
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                // Workers record digests while scans read them.
                .busy_timeout(Duration::from_millis(1500)),
            Access::ReadOnly => options.read_only(true),
        };
        Self::open(options, access, max_connections.max(1)).await
    }

    /// Connect to a fresh, migrated in-memory database.
    ///
    /// Not gated on `cfg(test)`: other crates use it in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(":memory:").foreign_keys(true);
        // Every connection to ":memory:" would see its own empty database.
        Self::open(options, Access::ReadWrite, 1).await
    }

    async fn open(options: SqliteConnectOptions, access: Access, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .after_connect(move |conn, _meta| Box::pin(async move { Self::apply_pragmas(conn, access).await }))
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool, access };
        match access {
            Access::ReadWrite => db.migrate().await?,
            Access::ReadOnly => db.ensure_migrated().await?,
        }
        Ok(db)
    }

    async fn apply_pragmas(conn: &mut SqliteConnection, access: Access) -> sqlx::Result<()> {
        // Digest maps are re-read on every run; keep them cached in memory.
        sqlx::query("PRAGMA cache_size = -16384; PRAGMA temp_store = MEMORY;")
            .execute(&mut *conn)
            .await?;
        if access == Access::ReadOnly {
            sqlx::query("PRAGMA query_only = ON").execute(&mut *conn).await?;
        }
        Ok(())
    }

    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Fail unless every embedded migration has already been applied.
    async fn ensure_migrated(&self) -> Result<()> {
        let latest = MIGRATOR.iter().map(|migration| migration.version).max().unwrap_or_default();
        let applied: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success")
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Migration)?;
        if applied.unwrap_or_default() < latest {
            exn::bail!(ErrorKind::Migration);
        }
        Ok(())
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for every connection to be returned, then close the pool.
    pub async fn close(&self) {
        if self.access == Access::ReadWrite {
            _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        }
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RepositoryDirectory, SqliteStore};
    use rstest::rstest;

    #[rstest]
    #[case(25, 10, 16)]
    #[case(1, 1, 2)]
    #[case(0, 0, 2)]
    #[case(3, 4, 7)]
    #[case(u32::MAX, usize::MAX, 16)]
    fn test_pool_size(#[case] scans_per_second: u32, #[case] workers: usize, #[case] expected: u32) {
        assert_eq!(Database::pool_size(scans_per_second, workers), expected);
    }

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        assert_eq!(db.access(), Access::ReadWrite);
        let row: (i64,) = sqlx::query_as("PRAGMA foreign_keys").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 1);
        db.ensure_migrated().await.unwrap();
        db.close().await;
        assert!(db.pool().is_closed());
    }

    #[tokio::test]
    async fn test_read_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.sqlite");
        let db = Database::connect(&path, Access::ReadWrite, 4).await.unwrap();
        assert!(path.exists());
        let mode: (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(mode.0, "wal");
        db.close().await;
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.sqlite");
        let db = Database::connect(&path, Access::ReadWrite, 2).await.unwrap();
        SqliteStore::from(&db).register_repository("stable", "https://charts.example.com").await.unwrap();
        db.close().await;

        let db = Database::connect(&path, Access::ReadOnly, 2).await.unwrap();
        let row: (i64,) = sqlx::query_as("PRAGMA query_only").fetch_one(db.pool()).await.unwrap();
        assert_eq!(row.0, 1);
        let store = SqliteStore::from(&db);
        assert_eq!(store.get_repository("stable").await.unwrap().url, "https://charts.example.com");
        let write = sqlx::query("DELETE FROM repositories").execute(db.pool()).await;
        assert!(write.is_err());
        db.close().await;
    }

    #[tokio::test]
    async fn test_read_only_never_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.sqlite");
        let err = Database::connect(&path, Access::ReadOnly, 1).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_read_only_requires_migrated_schema() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = Database::connect(file.path(), Access::ReadOnly, 1).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Migration);
    }
}
