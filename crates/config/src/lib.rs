//! Layered configuration for tracker.
//!
//! Sources are merged in order, later ones overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file: either the one passed explicitly, or any of
//!    `config.toml`, `config.yaml` and `config.json` found in the platform
//!    configuration directory.
//! 3. Environment variables prefixed with `TRACKER_`, using `__` to separate
//!    nested keys (`TRACKER_DISPATCHER__SCANS_PER_SECOND=5`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "TRACKER_";
const CONFIG_FILES: [&str; 3] = ["config.toml", "config.yaml", "config.json"];
const DATABASE_FILE: &str = "tracker.sqlite";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "tracker")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub dispatcher: DispatcherConfig,
    pub index: IndexConfig,
    pub workers: WorkersConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the repository directory and recorded digests.
    pub path: PathBuf,
    /// Skip every write to the database.
    pub dry_run: bool,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = project_dirs()
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE));
        Self { path, dry_run: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// New repository scans started per second; also the burst size.
    pub scans_per_second: u32,
    /// Jobs buffered in the queue before scans wait for workers.
    pub queue_capacity: usize,
}
impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            scans_per_second: 25,
            queue_capacity: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}
impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("tracker/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
impl IndexConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub count: usize,
}
impl Default for WorkersConfig {
    fn default() -> Self {
        Self { count: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directives; `RUST_LOG` takes precedence.
    pub filter: String,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

impl Config {
    /// Platform configuration directory searched when no file is given.
    pub fn config_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Build the layered figment without extracting it.
    ///
    /// An explicit `path` must exist and replaces the configuration directory
    /// search entirely.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.display().to_string()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                let files = Self::config_dir()
                    .into_iter()
                    .flat_map(|dir| CONFIG_FILES.map(|name| dir.join(name)))
                    .filter(|path| path.is_file());
                for file in files {
                    figment = merge_file(figment, &file)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate a configuration.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Extract)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from every source.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dispatcher.scans_per_second == 0 {
            exn::bail!(ErrorKind::Invalid("dispatcher.scans_per_second"));
        }
        if self.dispatcher.queue_capacity == 0 {
            exn::bail!(ErrorKind::Invalid("dispatcher.queue_capacity"));
        }
        if self.index.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("index.timeout_secs"));
        }
        if self.index.user_agent.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("index.user_agent"));
        }
        if self.workers.count == 0 {
            exn::bail!(ErrorKind::Invalid("workers.count"));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_ascii_lowercase();
    tracing::debug!(path = %path.display(), "Merging configuration file");
    Ok(match extension.as_str() {
        "toml" => figment.merge(Toml::file_exact(path)),
        "yaml" | "yml" => figment.merge(Yaml::file_exact(path)),
        "json" => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
    })
}
