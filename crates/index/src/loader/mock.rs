//! In-memory index loader for testing.

use crate::IndexDocument;
use crate::error::{ErrorKind, Result};
use crate::loader::IndexLoader;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

enum MockIndex {
    Document(IndexDocument),
    Failure(ErrorKind),
}

/// In-memory index loader for testing.
///
/// Documents are keyed by repository URL. Unknown URLs answer like a
/// server with no index (`404`). An optional delay is applied to every load
/// so tests can observe scans while they are still loading.
///
/// # Examples
///
/// ```
/// use tracker_index::{ArtifactVersion, IndexDocument, IndexLoader};
/// use tracker_index::loader::MockIndexLoader;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let loader = MockIndexLoader::with_documents([(
///     "https://charts.example.com",
///     IndexDocument::from_versions([ArtifactVersion::new("foo", "1.0.0", "aaa")]),
/// )]);
/// let index = loader.load_index("https://charts.example.com").await?;
/// assert_eq!(index.len(), 1);
/// assert!(loader.load_index("https://elsewhere.example.com").await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct MockIndexLoader {
    indexes: RwLock<HashMap<String, MockIndex>>,
    delay: Option<Duration>,
    loads: AtomicUsize,
}

impl MockIndexLoader {
    /// Create a mock loader pre-populated with documents.
    pub fn with_documents(documents: impl IntoIterator<Item = (impl Into<String>, IndexDocument)>) -> Self {
        let indexes = documents.into_iter().map(|(url, document)| (url.into(), MockIndex::Document(document))).collect();
        Self {
            indexes: RwLock::new(indexes),
            delay: None,
            loads: AtomicUsize::new(0),
        }
    }

    /// Make every load of `url` fail with a network error.
    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let failure = MockIndex::Failure(ErrorKind::Network(url.clone()));
        self.indexes.get_mut().insert(url, failure);
        self
    }

    /// Sleep (on the tokio clock) for `delay` before answering each load.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace (or add) the document served for `url`.
    pub async fn set_document(&self, url: impl Into<String>, document: IndexDocument) {
        self.indexes.write().await.insert(url.into(), MockIndex::Document(document));
    }

    /// Number of loads attempted so far, failed ones included.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
impl Default for MockIndexLoader {
    fn default() -> Self {
        let documents: [(&str, IndexDocument); 0] = [];
        Self::with_documents(documents)
    }
}

#[async_trait]
impl IndexLoader for MockIndexLoader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load_index(&self, url: &str) -> Result<IndexDocument> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.indexes.read().await.get(url) {
            Some(MockIndex::Document(document)) => Ok(document.clone()),
            Some(MockIndex::Failure(kind)) => Err(exn::Exn::from(kind.clone())),
            None => Err(exn::Exn::from(ErrorKind::Status {
                status: 404,
                url: url.to_string(),
            })),
        }
    }
}
