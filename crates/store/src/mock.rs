//! In-memory store for testing.

use crate::accessor::{DigestStore, RepositoryDirectory};
use crate::error::{ErrorKind, Result};
use crate::models::{KnownDigests, Repository};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory repository directory and digest store.
///
/// Repositories are listed in insertion order. Digest lookups for an
/// identifier that was never registered fail with
/// [`RepositoryNotFound`](ErrorKind::RepositoryNotFound).
#[derive(Debug, Default)]
pub struct MockStore {
    repositories: Vec<Repository>,
    digests: HashMap<String, KnownDigests>,
    failing: HashSet<String>,
    lookups: AtomicUsize,
}

impl MockStore {
    /// Register a repository with no recorded digests.
    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.digests.entry(repository.id.clone()).or_default();
        self.repositories.push(repository);
        self
    }

    /// Record digests (`name@version` → digest) for a repository identifier.
    pub fn with_digests(
        mut self,
        repository_id: impl Into<String>,
        digests: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.digests
            .entry(repository_id.into())
            .or_default()
            .extend(digests.into_iter().map(|(key, digest)| (key.into(), digest.into())));
        self
    }

    /// Make digest lookups for `repository_id` fail with a database error.
    pub fn with_digest_failure(mut self, repository_id: impl Into<String>) -> Self {
        self.failing.insert(repository_id.into());
        self
    }

    /// Number of digest lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepositoryDirectory for MockStore {
    async fn get_repository(&self, name: &str) -> Result<Repository> {
        self.repositories
            .iter()
            .find(|repository| repository.name == name)
            .cloned()
            .ok_or_else(|| exn::Exn::from(ErrorKind::RepositoryNotFound(name.to_string())))
    }

    async fn get_all_repositories(&self) -> Result<Vec<Repository>> {
        Ok(self.repositories.clone())
    }
}

#[async_trait]
impl DigestStore for MockStore {
    async fn get_known_digests(&self, repository_id: &str) -> Result<KnownDigests> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(repository_id) {
            exn::bail!(ErrorKind::Database);
        }
        self.digests
            .get(repository_id)
            .cloned()
            .ok_or_else(|| exn::Exn::from(ErrorKind::RepositoryNotFound(repository_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MockStore {
        MockStore::default()
            .with_repository(Repository::new("r1", "stable", "https://stable.example.com"))
            .with_repository(Repository::new("r2", "incubator", "https://incubator.example.com"))
            .with_digests("r1", [("foo@1.0.0", "aaa")])
    }

    #[tokio::test]
    async fn test_directory() {
        let store = store();
        assert_eq!(store.get_repository("incubator").await.unwrap().id, "r2");
        let names: Vec<_> = store.get_all_repositories().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["stable", "incubator"]);
        let err = store.get_repository("missing").await.unwrap_err();
        assert_eq!(*err, ErrorKind::RepositoryNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_digests() {
        let store = store();
        let digests = store.get_known_digests("r1").await.unwrap();
        assert_eq!(digests.get("foo@1.0.0").map(String::as_str), Some("aaa"));
        assert!(store.get_known_digests("r2").await.unwrap().is_empty());
        let err = store.get_known_digests("r3").await.unwrap_err();
        assert_eq!(*err, ErrorKind::RepositoryNotFound("r3".to_string()));
        assert_eq!(store.lookups(), 3);
    }

    #[tokio::test]
    async fn test_digest_failure() {
        let store = store().with_digest_failure("r1");
        let err = store.get_known_digests("r1").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database);
        assert!(err.is_retryable());
    }
}
