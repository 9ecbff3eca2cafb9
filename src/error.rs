//! Binary Error Types

use derive_more::{Display, Error};

/// A tracker error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for tracker commands.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not initialize logging")]
    Logging,
    #[display("store error")]
    Store,
    #[display("index loader error")]
    Index,
    #[display("dispatch failed")]
    Dispatch,
}
