//! Repository directory and digest store.
//!
//! The store records which repositories tracker knows about and, for each of
//! them, the content digest of every artifact version that has already been
//! processed. The dispatcher only reads from it, through two accessor traits:
//!
//! - [`RepositoryDirectory`]: resolve repository names into [`Repository`]
//!   descriptors (or list them all).
//! - [`DigestStore`]: load the [`KnownDigests`] of one repository, keyed by
//!   `name@version`.
//!
//! [`SqliteStore`] implements both on top of a SQLite [`Database`]. With the
//! `mock` feature, [`MockStore`] provides an in-memory implementation for
//! other crates' tests.

mod accessor;
mod db;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod models;
mod sqlite;

pub use crate::accessor::{DigestStore, RepositoryDirectory};
pub use crate::db::{Access, Database};
#[cfg(feature = "mock")]
pub use crate::mock::MockStore;
pub use crate::models::{KnownDigests, Repository};
pub use crate::sqlite::SqliteStore;
use std::sync::Arc;

pub type DirectoryHandle = Arc<dyn RepositoryDirectory + Send + Sync>;
pub type DigestHandle = Arc<dyn DigestStore + Send + Sync>;
