//! Index document models.
//!
//! The on-disk format is the Helm chart repository `index.yaml`:
//!
//! ```yaml
//! apiVersion: v1
//! entries:
//!   nginx:
//!     - name: nginx
//!       version: 1.2.0
//!       digest: 7c1e...
//!       urls: [https://charts.example.com/nginx-1.2.0.tgz]
//! generated: "2024-01-01T00:00:00Z"
//! ```

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// A single artifact version listed by a repository index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactVersion {
    pub name: String,
    pub version: String,
    /// Opaque fingerprint of the artifact content at the source. Older
    /// indexes may omit it, in which case it is empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub digest: String,
    /// Download locations for the packaged artifact.
    #[serde(default, deserialize_with = "null_as_default")]
    pub urls: Vec<String>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deprecated: bool,
}
impl ArtifactVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            digest: digest.into(),
            urls: Vec::new(),
            app_version: None,
            description: None,
            deprecated: false,
        }
    }

    /// Composite `name@version` key used to look up recorded digests.
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse one entry of an artifact group, or log why it is skipped.
fn parse_entry(group: &str, value: serde_yaml::Value) -> Option<ArtifactVersion> {
    if value.is_null() {
        tracing::warn!(artifact = %group, "Skipping empty index entry");
        return None;
    }
    match serde_yaml::from_value::<ArtifactVersion>(value) {
        Ok(version) if version.name.is_empty() || version.version.is_empty() => {
            tracing::warn!(artifact = %group, "Skipping index entry without name or version");
            None
        },
        Ok(version) => Some(version),
        Err(err) => {
            tracing::warn!(artifact = %group, error = %err, "Skipping invalid index entry");
            None
        },
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIndex {
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    entries: Option<BTreeMap<String, Option<Vec<serde_yaml::Value>>>>,
    #[serde(default)]
    generated: Option<String>,
}

/// Parsed repository index: artifact name → versions.
///
/// Groups iterate in artifact name order; versions inside a group keep the
/// order in which the source document listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDocument {
    pub api_version: Option<String>,
    /// Generation timestamp as written by the repository, unparsed.
    pub generated: Option<String>,
    entries: BTreeMap<String, Vec<ArtifactVersion>>,
}

impl IndexDocument {
    /// Parse a Helm-style index document.
    ///
    /// Entries that are empty, malformed or lack a name or version are logged
    /// and skipped; only a document that is not a valid index as a whole
    /// fails with [`ErrorKind::Parse`].
    pub fn from_yaml(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let raw: RawIndex = serde_yaml::from_slice(bytes.as_ref()).or_raise(|| ErrorKind::Parse)?;
        let mut entries: BTreeMap<String, Vec<ArtifactVersion>> = BTreeMap::new();
        for (group, values) in raw.entries.unwrap_or_default() {
            for value in values.unwrap_or_default() {
                if let Some(version) = parse_entry(&group, value) {
                    entries.entry(group.clone()).or_default().push(version);
                }
            }
        }
        Ok(Self {
            api_version: raw.api_version,
            generated: raw.generated,
            entries,
        })
    }

    /// Build a document from versions, grouping them by artifact name.
    pub fn from_versions(versions: impl IntoIterator<Item = ArtifactVersion>) -> Self {
        let mut document = Self::default();
        for version in versions {
            document.push(version);
        }
        document
    }

    /// Append a version to the end of its artifact group.
    pub fn push(&mut self, version: ArtifactVersion) {
        self.entries.entry(version.name.clone()).or_default().push(version);
    }

    /// Iterate artifact groups in the document's natural order.
    pub fn artifacts(&self) -> impl Iterator<Item = (&str, &[ArtifactVersion])> {
        self.entries.iter().map(|(name, versions)| (name.as_str(), versions.as_slice()))
    }

    /// Iterate every version entry, group by group.
    pub fn versions(&self) -> impl Iterator<Item = &ArtifactVersion> {
        self.entries.values().flatten()
    }

    /// Total number of version entries across all artifacts.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const INDEX: &str = include_str!("../tests/fixtures/index.yaml");

    #[test]
    fn test_parse_fixture() {
        let index = IndexDocument::from_yaml(INDEX).unwrap();
        assert_eq!(index.api_version.as_deref(), Some("v1"));
        assert_eq!(index.generated.as_deref(), Some("2024-03-11T09:12:44.123456789Z"));
        assert_eq!(index.len(), 4);
        let names: Vec<_> = index.artifacts().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["nginx", "redis"]);
    }

    #[test]
    fn test_versions_keep_source_order() {
        let index = IndexDocument::from_yaml(INDEX).unwrap();
        let (_, nginx) = index.artifacts().next().unwrap();
        let versions: Vec<_> = nginx.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(versions, vec!["1.2.0", "1.10.0", "1.1.0"]);
    }

    #[test]
    fn test_optional_metadata() {
        let index = IndexDocument::from_yaml(INDEX).unwrap();
        let redis = index.versions().find(|v| v.name == "redis").unwrap();
        assert_eq!(redis.app_version.as_deref(), Some("7.2.4"));
        assert!(redis.deprecated);
        assert_eq!(redis.urls, vec!["https://charts.example.com/redis-18.0.1.tgz".to_string()]);
        let nginx = index.versions().find(|v| v.version == "1.1.0").unwrap();
        // Digest was omitted in the fixture.
        assert_eq!(nginx.digest, "");
        assert_eq!(nginx.description, None);
    }

    #[rstest]
    #[case("apiVersion: v1\nentries: {}\n", 0)]
    #[case("apiVersion: v1\n", 0)]
    #[case("apiVersion: v1\nentries:\n", 0)]
    #[case("entries:\n  a:\n    - name: a\n      version: 0.1.0\n      digest: abc\n", 1)]
    fn test_parse_sparse_documents(#[case] input: &str, #[case] expected: usize) {
        let index = IndexDocument::from_yaml(input).unwrap();
        assert_eq!(index.len(), expected);
        assert_eq!(index.is_empty(), expected == 0);
    }

    #[rstest]
    #[case("entries: [not, a, map]")]
    #[case("entries:\n  a: not-a-list\n")]
    #[case("{unclosed")]
    fn test_parse_invalid(#[case] input: &str) {
        let err = IndexDocument::from_yaml(input).unwrap_err();
        assert_eq!(*err, ErrorKind::Parse);
    }

    const GOOD: &str = "    - name: a\n      version: 0.1.0\n      digest: abc\n";

    #[rstest]
    #[case::missing_version("    - name: a\n      digest: def\n")]
    #[case::missing_name("    - version: 0.2.0\n")]
    #[case::empty_version("    - name: a\n      version: \"\"\n")]
    #[case::null_version("    - name: a\n      version: ~\n")]
    #[case::null_entry("    - ~\n")]
    #[case::wrong_type("    - name: a\n      version: 0.2.0\n      urls: {x: y}\n")]
    fn test_invalid_entries_are_skipped(#[case] bad: &str) {
        let input = format!("entries:\n  a:\n{GOOD}{bad}");
        let index = IndexDocument::from_yaml(input).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.versions().next().map(ArtifactVersion::key), Some("a@0.1.0".to_string()));
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let input = "entries:\n  a:\n    - name: a\n      version: 0.1.0\n      digest: ~\n      urls: ~\n      deprecated: ~\n  b: ~\n";
        let index = IndexDocument::from_yaml(input).unwrap();
        assert_eq!(index.len(), 1);
        let version = index.versions().next().unwrap();
        assert_eq!(version, &ArtifactVersion::new("a", "0.1.0", ""));
    }

    #[test]
    fn test_key() {
        let version = ArtifactVersion::new("foo", "1.0.0", "aaa");
        assert_eq!(version.key(), "foo@1.0.0");
    }

    #[test]
    fn test_from_versions_groups_by_name() {
        let index = IndexDocument::from_versions([
            ArtifactVersion::new("b", "1.0.0", "x"),
            ArtifactVersion::new("a", "2.0.0", "y"),
            ArtifactVersion::new("b", "0.9.0", "z"),
        ]);
        let groups: Vec<_> = index.artifacts().map(|(name, versions)| (name, versions.len())).collect();
        assert_eq!(groups, vec![("a", 1), ("b", 2)]);
        let b: Vec<_> = index.versions().filter(|v| v.name == "b").map(|v| v.version.as_str()).collect();
        assert_eq!(b, vec!["1.0.0", "0.9.0"]);
    }
}
