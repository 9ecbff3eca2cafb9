//! Opening the store database for a command.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use tracker_config::Config;
use tracker_store::{Access, Database};

/// Open the configured database.
///
/// A dry run never creates or migrates anything: an existing file is opened
/// read-only and a missing one is replaced by an empty in-memory store.
pub async fn open(config: &Config) -> Result<Database> {
    let path = &config.database.path;
    let max_connections = Database::pool_size(config.dispatcher.scans_per_second, config.workers.count);
    if !config.database.dry_run {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Store)?;
        }
        return Database::connect(path, Access::ReadWrite, max_connections).await.or_raise(|| ErrorKind::Store);
    }
    tracing::info!("Dry run: nothing will be written to the database");
    if path.is_file() {
        Database::connect(path, Access::ReadOnly, max_connections).await.or_raise(|| ErrorKind::Store)
    } else {
        tracing::warn!(path = %path.display(), "No database yet; dry run starts from an empty store");
        Database::connect_in_memory().await.or_raise(|| ErrorKind::Store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tracker_store::{RepositoryDirectory, SqliteStore};

    fn config(path: &Path, dry_run: bool) -> Config {
        let mut config = Config::default();
        config.database.path = path.to_path_buf();
        config.database.dry_run = dry_run;
        config
    }

    #[tokio::test]
    async fn test_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("tracker.sqlite");
        let db = open(&config(&path, false)).await.unwrap();
        assert_eq!(db.access(), Access::ReadWrite);
        assert!(path.is_file());
        db.close().await;
    }

    #[tokio::test]
    async fn test_dry_run_leaves_filesystem_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("tracker.sqlite");
        let db = open(&config(&path, true)).await.unwrap();
        assert!(SqliteStore::from(&db).get_all_repositories().await.unwrap().is_empty());
        db.close().await;
        assert!(!dir.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_dry_run_opens_existing_file_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.sqlite");
        let db = open(&config(&path, false)).await.unwrap();
        SqliteStore::from(&db).register_repository("stable", "https://charts.example.com").await.unwrap();
        db.close().await;

        let db = open(&config(&path, true)).await.unwrap();
        assert_eq!(db.access(), Access::ReadOnly);
        let repositories = SqliteStore::from(&db).get_all_repositories().await.unwrap();
        assert_eq!(repositories.len(), 1);
        db.close().await;
    }
}
