use async_stream::stream;
use futures::Stream;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracker_index::ArtifactVersion;
use tracker_store::Repository;

/// One artifact version that needs processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Repository the version was found in, shared by every job of one scan.
    pub repository: Arc<Repository>,
    pub version: ArtifactVersion,
}
impl Job {
    /// Composite `name@version` key of the artifact version.
    pub fn key(&self) -> String {
        self.version.key()
    }
}

/// Receiving end of the job queue.
///
/// Yields jobs until the run that produced them has finished, then `None`
/// forever.
#[derive(Debug)]
pub struct JobQueue {
    receiver: mpsc::Receiver<Job>,
}

impl JobQueue {
    pub async fn recv(&mut self) -> Option<Job> {
        self.receiver.recv().await
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Expose the queue as a stream, e.g. to drain it with
    /// [`for_each_concurrent`](futures::StreamExt::for_each_concurrent).
    pub fn into_stream(mut self) -> impl Stream<Item = Job> {
        stream! {
            while let Some(job) = self.receiver.recv().await {
                yield job;
            }
        }
    }
}

/// Create a job queue holding at most `capacity` (minimum one) unclaimed jobs.
pub(crate) fn channel(capacity: usize) -> (mpsc::Sender<Job>, JobQueue) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (sender, JobQueue { receiver })
}
