//! HTTP index loader.

use crate::IndexDocument;
use crate::error::{ErrorKind, Result};
use crate::loader::IndexLoader;
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::instrument;

const INDEX_FILE: &str = "index.yaml";

/// Downloads `index.yaml` from HTTP(S) repositories.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use tracker_index::IndexLoader;
/// use tracker_index::loader::HttpIndexLoader;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let loader = HttpIndexLoader::new(Duration::from_secs(30), "tracker")?;
/// let index = loader.load_index("https://charts.example.com").await?;
/// println!("{} versions", index.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpIndexLoader {
    client: Client,
}
impl HttpIndexLoader {
    pub fn new(timeout: Duration, user_agent: impl AsRef<str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.as_ref())
            .gzip(true)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client })
    }

    /// Resolve the index document URL for a repository URL.
    ///
    /// Only `http` and `https` are accepted. Query strings and fragments are
    /// dropped; a trailing slash on the repository path is tolerated.
    pub fn index_url(repository_url: &str) -> Result<Url> {
        let mut url = Url::parse(repository_url).or_raise(|| ErrorKind::InvalidUrl(repository_url.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::InvalidUrl(repository_url.to_string()));
        }
        let path = format!("{}/{INDEX_FILE}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

#[async_trait]
impl IndexLoader for HttpIndexLoader {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument("downloading repository index", skip(self))]
    async fn load_index(&self, url: &str) -> Result<IndexDocument> {
        let index_url = Self::index_url(url)?;
        let response =
            self.client.get(index_url.clone()).send().await.or_raise(|| ErrorKind::Network(index_url.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status {
                status: status.as_u16(),
                url: index_url.to_string(),
            });
        }
        let body = response.bytes().await.or_raise(|| ErrorKind::Network(index_url.to_string()))?;
        tracing::debug!(url = %index_url, bytes = body.len(), "Downloaded repository index");
        IndexDocument::from_yaml(&body)
    }
}
