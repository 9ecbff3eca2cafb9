//! Index loader trait and implementations.

mod http;
#[cfg(feature = "mock")]
mod mock;

pub use self::http::HttpIndexLoader;
#[cfg(feature = "mock")]
pub use self::mock::MockIndexLoader;
use crate::IndexDocument;
use crate::error::Result;
use async_trait::async_trait;

/// Retrieves and parses the index document of a repository.
///
/// Implementations own transport concerns (HTTP, authentication, caching);
/// callers only see a parsed [`IndexDocument`] or an error.
///
/// # Examples
///
/// ```no_run
/// use tracker_index::{IndexLoader, error::Result};
///
/// async fn count_versions(loader: &dyn IndexLoader, url: &str) -> Result<usize> {
///     let index = loader.load_index(url).await?;
///     Ok(index.len())
/// }
/// ```
#[async_trait]
pub trait IndexLoader: Send + Sync {
    /// Short name of the loader implementation (used for logging only).
    fn name(&self) -> &str;

    /// Download and parse the index document of the repository at `url`.
    ///
    /// `url` is the repository URL as recorded in the repository directory,
    /// not the URL of the index document itself.
    async fn load_index(&self, url: &str) -> Result<IndexDocument>;
}
