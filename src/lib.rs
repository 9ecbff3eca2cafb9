//! Shared pieces of the `tracker` binary.
//!
//! The worker pool and database setup live here rather than in `main.rs` so
//! they can be tested against a real store.

pub mod database;
pub mod error;
pub mod worker;
