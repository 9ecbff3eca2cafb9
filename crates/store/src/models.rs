use std::collections::HashMap;

/// Digests recorded for one repository, keyed by `name@version`.
pub type KnownDigests = HashMap<String, String>;

/// A package repository known to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Opaque, stable identifier.
    pub id: String,
    pub name: String,
    /// Base URL the index document is fetched from.
    pub url: String,
}
impl Repository {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RepositoryRow {
    repository_id: String,
    name: String,
    url: String,
}
impl From<RepositoryRow> for Repository {
    fn from(row: RepositoryRow) -> Self {
        Self {
            id: row.repository_id,
            name: row.name,
            url: row.url,
        }
    }
}
