//! SQLite implementation of the accessor traits.
//!
//! Besides the read side used by the dispatcher, the store exposes the few
//! writes needed to maintain the directory and to record processed digests.

use crate::Database;
use crate::accessor::{DigestStore, RepositoryDirectory};
use crate::error::{ErrorKind, Result};
use crate::models::{KnownDigests, Repository, RepositoryRow};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::instrument;

/// Repository directory and digest store backed by SQLite.
///
/// Writes are skipped (but reported as successful) when `dry_run` is set.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for SqliteStore {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl SqliteStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    async fn find_by_id(&self, repository_id: &str) -> Result<Option<Repository>> {
        let row: Option<RepositoryRow> = sqlx::query_as(include_str!("../queries/get_repository_by_id.sql"))
            .bind(repository_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.map(Repository::from))
    }

    // =========================================================================
    // Directory maintenance
    // =========================================================================

    /// Register a repository, or update the URL of an existing one.
    ///
    /// Identifiers are generated on first registration and never change.
    /// In dry-run mode nothing is written and an existing repository (or a
    /// placeholder with an empty identifier) is returned.
    pub async fn register_repository(&self, name: impl AsRef<str>, url: impl AsRef<str>) -> Result<Repository> {
        let (name, url) = (name.as_ref(), url.as_ref());
        if self.dry_run {
            let existing: Option<RepositoryRow> = sqlx::query_as(include_str!("../queries/get_repository_by_name.sql"))
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
            let id = existing.map(|row| Repository::from(row).id).unwrap_or_default();
            return Ok(Repository::new(id, name, url));
        }
        let row: RepositoryRow = sqlx::query_as(include_str!("../queries/upsert_repository.sql"))
            .bind(name)
            .bind(url)
            .bind(OffsetDateTime::now_utc().unix_timestamp())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.into())
    }

    /// Remove a repository and every digest recorded for it.
    ///
    /// Returns `true` if a repository was removed.
    pub async fn remove_repository(&self, name: impl AsRef<str>) -> Result<bool> {
        if self.dry_run {
            return Ok(true);
        }
        let result = sqlx::query(include_str!("../queries/delete_repository.sql"))
            .bind(name.as_ref())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Digests
    // =========================================================================

    /// Record `digest` as the processed content of `name@version`.
    pub async fn record_digest(
        &self,
        repository_id: impl AsRef<str>,
        name: impl AsRef<str>,
        version: impl AsRef<str>,
        digest: impl AsRef<str>,
    ) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        let repository_id = repository_id.as_ref();
        // Foreign key violations only say "constraint failed"; check first so
        // the caller gets an actionable error.
        self.find_by_id(repository_id)
            .await?
            .ok_or_raise(|| ErrorKind::RepositoryNotFound(repository_id.to_string()))?;
        sqlx::query(include_str!("../queries/upsert_digest.sql"))
            .bind(repository_id)
            .bind(name.as_ref())
            .bind(version.as_ref())
            .bind(digest.as_ref())
            .bind(OffsetDateTime::now_utc().unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}

#[async_trait]
impl RepositoryDirectory for SqliteStore {
    async fn get_repository(&self, name: &str) -> Result<Repository> {
        let row: Option<RepositoryRow> = sqlx::query_as(include_str!("../queries/get_repository_by_name.sql"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Repository::from).ok_or_raise(|| ErrorKind::RepositoryNotFound(name.to_string()))
    }

    async fn get_all_repositories(&self) -> Result<Vec<Repository>> {
        let rows: Vec<RepositoryRow> = sqlx::query_as(include_str!("../queries/list_repositories.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Repository::from).collect())
    }
}

#[async_trait]
impl DigestStore for SqliteStore {
    #[instrument("loading known digests", skip(self))]
    async fn get_known_digests(&self, repository_id: &str) -> Result<KnownDigests> {
        self.find_by_id(repository_id)
            .await?
            .ok_or_raise(|| ErrorKind::RepositoryNotFound(repository_id.to_string()))?;
        let rows: Vec<(String, String)> = sqlx::query_as(include_str!("../queries/get_packages_digest.sql"))
            .bind(repository_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        let db = Database::connect_in_memory().await.unwrap();
        SqliteStore::from(&db)
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let store = store().await;
        let registered = store.register_repository("stable", "https://charts.example.com/stable").await.unwrap();
        assert!(!registered.id.is_empty());
        let fetched = store.get_repository("stable").await.unwrap();
        assert_eq!(fetched, registered);
    }

    #[tokio::test]
    async fn test_register_twice_keeps_id_and_updates_url() {
        let store = store().await;
        let first = store.register_repository("stable", "https://old.example.com").await.unwrap();
        let second = store.register_repository("stable", "https://new.example.com").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.url, "https://new.example.com");
        assert_eq!(store.get_all_repositories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_repository() {
        let store = store().await;
        let err = store.get_repository("missing").await.unwrap_err();
        assert_eq!(*err, ErrorKind::RepositoryNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let store = store().await;
        store.register_repository("zeta", "https://z.example.com").await.unwrap();
        store.register_repository("alpha", "https://a.example.com").await.unwrap();
        let names: Vec<_> = store.get_all_repositories().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_resolve() {
        let store = store().await;
        store.register_repository("a", "https://a.example.com").await.unwrap();
        store.register_repository("b", "https://b.example.com").await.unwrap();
        assert_eq!(store.resolve(&[]).await.unwrap().len(), 2);
        let named = store.resolve(&["b".to_string()]).await.unwrap();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].name, "b");
        let repeated = store.resolve(&["b".to_string(), "a".to_string(), "b".to_string()]).await.unwrap();
        let names: Vec<_> = repeated.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b", "a"]);
        let err = store.resolve(&["a".to_string(), "nope".to_string()]).await.unwrap_err();
        assert_eq!(*err, ErrorKind::RepositoryNotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_record_and_load_digests() {
        let store = store().await;
        let repo = store.register_repository("stable", "https://charts.example.com").await.unwrap();
        assert!(store.get_known_digests(&repo.id).await.unwrap().is_empty());
        store.record_digest(&repo.id, "foo", "1.0.0", "aaa").await.unwrap();
        store.record_digest(&repo.id, "foo", "1.1.0", "bbb").await.unwrap();
        // Re-recording replaces the digest.
        store.record_digest(&repo.id, "foo", "1.0.0", "ccc").await.unwrap();
        let digests = store.get_known_digests(&repo.id).await.unwrap();
        assert_eq!(digests.len(), 2);
        assert_eq!(digests.get("foo@1.0.0").map(String::as_str), Some("ccc"));
        assert_eq!(digests.get("foo@1.1.0").map(String::as_str), Some("bbb"));
    }

    #[tokio::test]
    async fn test_digests_are_scoped_to_repository() {
        let store = store().await;
        let a = store.register_repository("a", "https://a.example.com").await.unwrap();
        let b = store.register_repository("b", "https://b.example.com").await.unwrap();
        store.record_digest(&a.id, "foo", "1.0.0", "aaa").await.unwrap();
        assert!(store.get_known_digests(&b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_repository_id() {
        let store = store().await;
        let err = store.get_known_digests("0123").await.unwrap_err();
        assert_eq!(*err, ErrorKind::RepositoryNotFound("0123".to_string()));
        let err = store.record_digest("0123", "foo", "1.0.0", "aaa").await.unwrap_err();
        assert_eq!(*err, ErrorKind::RepositoryNotFound("0123".to_string()));
    }

    #[tokio::test]
    async fn test_remove_repository_cascades() {
        let store = store().await;
        let repo = store.register_repository("stable", "https://charts.example.com").await.unwrap();
        store.record_digest(&repo.id, "foo", "1.0.0", "aaa").await.unwrap();
        assert!(store.remove_repository("stable").await.unwrap());
        assert!(!store.remove_repository("stable").await.unwrap());
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM package_digests").fetch_one(&store.pool).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_dry_run_skips_writes() {
        let db = Database::connect_in_memory().await.unwrap();
        let live = SqliteStore::from(&db);
        let repo = live.register_repository("stable", "https://charts.example.com").await.unwrap();
        let dry = SqliteStore::new(db.pool().clone(), true);
        dry.record_digest(&repo.id, "foo", "1.0.0", "aaa").await.unwrap();
        assert!(live.get_known_digests(&repo.id).await.unwrap().is_empty());
        let placeholder = dry.register_repository("other", "https://other.example.com").await.unwrap();
        assert_eq!(placeholder.id, "");
        assert!(live.get_repository("other").await.is_err());
        let existing = dry.register_repository("stable", "https://moved.example.com").await.unwrap();
        assert_eq!(existing.id, repo.id);
        assert_eq!(live.get_repository("stable").await.unwrap().url, "https://charts.example.com");
    }
}
