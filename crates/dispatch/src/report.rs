use crate::error::ErrorKind;

/// How a single repository scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every index entry was diffed; `jobs` of them were queued.
    Completed { jobs: usize },
    /// Cancellation was observed after `jobs` had been queued.
    Cancelled { jobs: usize },
    /// The scan was aborted before diffing; no job was queued after the
    /// failure.
    Failed(ErrorKind),
}
impl ScanOutcome {
    pub fn jobs(&self) -> usize {
        match self {
            Self::Completed { jobs } | Self::Cancelled { jobs } => *jobs,
            Self::Failed(_) => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Name of the scanned repository.
    pub repository: String,
    pub outcome: ScanOutcome,
}

/// Summary of one dispatcher run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Number of repositories the requested names resolved to.
    pub repositories: usize,
    /// One report per scan that was started, in completion order.
    pub scans: Vec<ScanReport>,
    /// Scan tasks that panicked; they have no report.
    pub panicked: usize,
    /// `true` if cancellation stopped the run from starting every scan.
    pub cancelled: bool,
}
impl RunReport {
    /// Total number of jobs queued across every scan.
    pub fn jobs(&self) -> usize {
        self.scans.iter().map(|scan| scan.outcome.jobs()).sum()
    }

    /// Number of scans that failed.
    pub fn failed(&self) -> usize {
        self.scans.iter().filter(|scan| matches!(scan.outcome, ScanOutcome::Failed(_))).count()
    }

    /// Number of failed scans that may succeed on a later run.
    pub fn retryable(&self) -> usize {
        self.scans
            .iter()
            .filter(|scan| matches!(&scan.outcome, ScanOutcome::Failed(kind) if kind.is_retryable()))
            .count()
    }

    /// Look up the report of the named repository.
    pub fn scan(&self, repository: &str) -> Option<&ScanReport> {
        self.scans.iter().find(|scan| scan.repository == repository)
    }
}
