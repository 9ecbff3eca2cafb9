//! Repository index loading.
//!
//! A package repository publishes an index document listing every artifact
//! version it currently offers. This crate defines the [`IndexLoader`]
//! contract used by the dispatcher, the [`IndexDocument`] model it produces,
//! and the implementations shipped with tracker:
//!
//! - [`HttpIndexLoader`](loader::HttpIndexLoader) downloads a Helm-style
//!   `index.yaml` from the repository URL.
//! - [`MockIndexLoader`](loader::MockIndexLoader) (feature `mock`) serves
//!   documents from memory for tests.

pub mod error;
pub mod loader;
mod models;

pub use crate::loader::IndexLoader;
pub use crate::models::{ArtifactVersion, IndexDocument};
use std::sync::Arc;

pub type LoaderHandle = Arc<dyn IndexLoader + Send + Sync>;
