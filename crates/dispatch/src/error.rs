//! Dispatch Error Types
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! Only [`ErrorKind::Resolve`] is ever returned from a run; the per-repository
//! kinds end up in [`ScanOutcome::Failed`](crate::ScanOutcome::Failed).

use derive_more::{Display, Error};

/// A dispatch error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a dispatch failure.
///
/// ### Run Errors
/// - [`ErrorKind::Resolve`]
/// - [`ErrorKind::InvalidRate`]
///
/// ### Scan Errors
/// - [`ErrorKind::IndexLoad`]
/// - [`ErrorKind::Digests`]
/// - [`ErrorKind::QueueClosed`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// At least one requested repository is unknown, or the directory could
    /// not be listed. No scan was started.
    #[display("could not resolve repositories")]
    Resolve,
    /// The repository index could not be downloaded or parsed.
    #[display("could not load repository index")]
    IndexLoad,
    /// The digests recorded for the repository could not be loaded.
    #[display("could not load known digests")]
    Digests,
    /// Every consumer of the job queue has gone away.
    #[display("job queue closed")]
    QueueClosed,
    /// The operation observed cancellation before it could complete.
    #[display("cancelled")]
    Cancelled,
    #[display("invalid scan rate: {_0} per second")]
    InvalidRate(#[error(not(source))] u32),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IndexLoad | Self::Digests)
    }
}
