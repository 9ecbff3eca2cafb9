//! Index Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An index error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The repository URL cannot be turned into an index URL.
    #[display("invalid repository url: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// The HTTP client could not be constructed.
    #[display("HTTP client error")]
    Client,
    /// Connection, TLS or timeout failure while downloading the index.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The server answered, but not with a success status.
    #[display("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    /// The index document is not valid YAML or misses required fields.
    #[display("invalid index document")]
    Parse,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
