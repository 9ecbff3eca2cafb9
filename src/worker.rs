//! Worker pool draining the job queue.
//!
//! Processing an artifact version is out of scope for tracker itself: a
//! worker logs the job and records its digest, so the next run only
//! dispatches the version again if its content changes.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::instrument;
use tracker_dispatch::{Job, JobQueue};
use tracker_store::SqliteStore;

/// Jobs handled by [`drain`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub processed: usize,
    pub failed: usize,
}

/// Handle every job until the queue closes, `concurrency` at a time.
pub async fn drain(queue: JobQueue, store: &SqliteStore, concurrency: usize) -> DrainReport {
    let processed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    queue
        .into_stream()
        .for_each_concurrent(concurrency.max(1), |job| {
            let (processed, failed) = (&processed, &failed);
            async move {
                match process(store, &job).await {
                    Ok(()) => processed.fetch_add(1, Ordering::Relaxed),
                    Err(err) => {
                        tracing::warn!(repo = %job.repository.name, artifact = %job.key(), error = ?err, "Job failed");
                        failed.fetch_add(1, Ordering::Relaxed)
                    },
                };
            }
        })
        .await;
    DrainReport {
        processed: processed.into_inner(),
        failed: failed.into_inner(),
    }
}

/// Handle a single job.
#[instrument("processing job", skip_all, fields(repo = %job.repository.name, artifact = %job.key()))]
pub async fn process(store: &SqliteStore, job: &Job) -> Result<()> {
    let version = &job.version;
    tracing::info!(
        digest = %version.digest,
        app_version = version.app_version.as_deref(),
        deprecated = version.deprecated,
        download = version.urls.first().map(String::as_str),
        "New or changed artifact version"
    );
    store
        .record_digest(&job.repository.id, &version.name, &version.version, &version.digest)
        .await
        .or_raise(|| ErrorKind::Store)
}
