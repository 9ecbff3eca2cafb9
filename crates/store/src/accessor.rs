//! Read-side accessor traits used by the dispatcher.

use crate::error::Result;
use crate::{KnownDigests, Repository};
use async_trait::async_trait;
use std::collections::HashSet;

/// Resolves repository names into [`Repository`] descriptors.
#[async_trait]
pub trait RepositoryDirectory: Send + Sync {
    /// Get the repository registered under `name`.
    ///
    /// Returns [`RepositoryNotFound`](crate::error::ErrorKind::RepositoryNotFound)
    /// if no such repository exists.
    async fn get_repository(&self, name: &str) -> Result<Repository>;

    /// List every known repository.
    async fn get_all_repositories(&self) -> Result<Vec<Repository>>;

    /// Resolve a list of names, or every repository when `names` is empty.
    ///
    /// Repeated names resolve once, at their first position. Fails on the
    /// first name that cannot be resolved; a partial list is never returned.
    async fn resolve(&self, names: &[String]) -> Result<Vec<Repository>> {
        if names.is_empty() {
            return self.get_all_repositories().await;
        }
        let mut seen = HashSet::with_capacity(names.len());
        let mut repositories = Vec::with_capacity(names.len());
        for name in names {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let repository = self.get_repository(name).await?;
            if repositories.iter().any(|known: &Repository| known.id == repository.id) {
                continue;
            }
            repositories.push(repository);
        }
        Ok(repositories)
    }
}

/// Looks up the digests already recorded for a repository.
#[async_trait]
pub trait DigestStore: Send + Sync {
    /// Load the `name@version` → digest map of the repository with the given
    /// identifier.
    ///
    /// Returns [`RepositoryNotFound`](crate::error::ErrorKind::RepositoryNotFound)
    /// if the identifier is unknown.
    async fn get_known_digests(&self, repository_id: &str) -> Result<KnownDigests>;
}
