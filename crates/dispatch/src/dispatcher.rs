use crate::error::{ErrorKind, Result};
use crate::limiter::RateLimiter;
use crate::queue::{Job, JobQueue, channel};
use crate::report::RunReport;
use crate::scan::scan_repository;
use exn::ResultExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tracker_index::LoaderHandle;
use tracker_store::{DigestHandle, DirectoryHandle};

/// The collaborators a dispatcher reads from.
#[derive(Clone)]
pub struct Context {
    pub directory: DirectoryHandle,
    pub digests: DigestHandle,
    pub loader: LoaderHandle,
}

/// Coordinates one run: resolves repositories, starts one rate-limited scan
/// per repository and closes the [`JobQueue`] once every scan has returned.
///
/// A dispatcher is single-use; [`run`](Self::run) consumes it. The queue
/// handed out by [`new`](Self::new) reports end-of-stream exactly when the run
/// is over.
pub struct Dispatcher {
    ctx: Context,
    limiter: Arc<RateLimiter>,
    sender: mpsc::Sender<Job>,
}

impl Dispatcher {
    /// Create a dispatcher together with the queue it will fill.
    ///
    /// The queue buffers at most `capacity` unclaimed jobs (at least one);
    /// scans wait for workers beyond that.
    pub fn new(ctx: Context, limiter: Arc<RateLimiter>, capacity: usize) -> (Self, JobQueue) {
        let (sender, queue) = channel(capacity);
        (Self { ctx, limiter, sender }, queue)
    }

    /// Scan the named repositories, or every known repository if `names` is
    /// empty.
    ///
    /// Fails only if the names cannot be resolved, in which case nothing is
    /// scanned and the queue closes empty. Per-repository failures and
    /// cancellation are reported in the returned [`RunReport`]; the future
    /// resolves once every started scan has returned.
    #[instrument("dispatching", skip_all, fields(requested = names.len()))]
    pub async fn run(self, names: &[String], cancel: &CancellationToken) -> Result<RunReport> {
        let Self { ctx, limiter, sender } = self;
        let repositories = match ctx.directory.resolve(names).await.or_raise(|| ErrorKind::Resolve) {
            Ok(repositories) => repositories,
            Err(err) => {
                tracing::error!(error = ?err, "Could not resolve repositories");
                return Err(err);
            },
        };
        tracing::info!(repositories = repositories.len(), "Starting repository scans");

        let mut report = RunReport {
            repositories: repositories.len(),
            ..RunReport::default()
        };
        let mut scans = JoinSet::new();
        for repository in repositories {
            if limiter.acquire(cancel).await.is_err() {
                tracing::info!(started = scans.len(), "Cancelled; no further scans will start");
                report.cancelled = true;
                break;
            }
            let (ctx, sender, cancel) = (ctx.clone(), sender.clone(), cancel.clone());
            let repository = Arc::new(repository);
            scans.spawn(async move { scan_repository(&ctx, repository, &sender, &cancel).await });
        }

        while let Some(joined) = scans.join_next().await {
            match joined {
                Ok(scan) => report.scans.push(scan),
                Err(err) => {
                    tracing::error!(error = ?err, "Repository scan panicked");
                    report.panicked += 1;
                },
            }
        }
        // Every scan has returned its sender clone; this closes the queue.
        drop(sender);
        tracing::info!(
            jobs = report.jobs(),
            failed = report.failed(),
            retryable = report.retryable(),
            panicked = report.panicked,
            cancelled = report.cancelled,
            "Dispatch complete"
        );
        Ok(report)
    }

    /// Run on a new tokio task.
    pub fn spawn(self, names: Vec<String>, cancel: CancellationToken) -> JoinHandle<Result<RunReport>> {
        tokio::spawn(async move { self.run(&names, &cancel).await })
    }
}
