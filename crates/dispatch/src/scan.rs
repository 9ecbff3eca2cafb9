//! Per-repository scan: diff a freshly loaded index against the digests
//! recorded for the repository and queue every new or changed version.

use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::queue::Job;
use crate::report::{ScanOutcome, ScanReport};
use exn::ResultExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tracker_store::Repository;

/// Scan one repository, logging (rather than returning) any failure.
#[instrument("scanning repository", skip_all, fields(repo = %repository.name, loader = ctx.loader.name()))]
pub(crate) async fn scan_repository(
    ctx: &Context,
    repository: Arc<Repository>,
    jobs: &mpsc::Sender<Job>,
    cancel: &CancellationToken,
) -> ScanReport {
    let name = repository.name.clone();
    let outcome = match scan_inner(ctx, repository, jobs, cancel).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(repo = %name, error = ?err, "Repository scan failed");
            ScanOutcome::Failed((*err).clone())
        },
    };
    match &outcome {
        ScanOutcome::Completed { jobs } => tracing::info!(repo = %name, jobs, "Repository scanned"),
        ScanOutcome::Cancelled { jobs } => tracing::info!(repo = %name, jobs, "Repository scan cancelled"),
        ScanOutcome::Failed(_) => {},
    }
    ScanReport { repository: name, outcome }
}

async fn scan_inner(
    ctx: &Context,
    repository: Arc<Repository>,
    jobs: &mpsc::Sender<Job>,
    cancel: &CancellationToken,
) -> Result<ScanOutcome> {
    let index = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(ScanOutcome::Cancelled { jobs: 0 }),
        index = ctx.loader.load_index(&repository.url) => index.or_raise(|| ErrorKind::IndexLoad)?,
    };
    let known = ctx.digests.get_known_digests(&repository.id).await.or_raise(|| ErrorKind::Digests)?;
    tracing::debug!(repo = %repository.name, entries = index.len(), known = known.len(), "Diffing index");

    let mut queued = 0;
    for version in index.versions() {
        if cancel.is_cancelled() {
            return Ok(ScanOutcome::Cancelled { jobs: queued });
        }
        if known.get(&version.key()) == Some(&version.digest) {
            continue;
        }
        let job = Job {
            repository: Arc::clone(&repository),
            version: version.clone(),
        };
        tokio::select! {
            biased;
            // A job whose send loses the race is dropped, never half-delivered.
            _ = cancel.cancelled() => return Ok(ScanOutcome::Cancelled { jobs: queued }),
            sent = jobs.send(job) => sent.or_raise(|| ErrorKind::QueueClosed)?,
        }
        queued += 1;
    }
    Ok(ScanOutcome::Completed { jobs: queued })
}
