//! Repository scanning and job dispatch.
//!
//! A [`Dispatcher`] resolves a set of repositories, starts one scan per
//! repository (no faster than its [`RateLimiter`] allows) and, for every
//! artifact version whose digest is new or has changed since it was last
//! recorded, sends a [`Job`] to the [`JobQueue`]. The queue closes once every
//! scan has returned, which tells the worker pool that the run is over.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use futures::StreamExt;
//! # use tokio_util::sync::CancellationToken;
//! # use tracker_dispatch::{Context, Dispatcher, RateLimiter};
//! # async fn example(ctx: Context) -> tracker_dispatch::error::Result<()> {
//! let limiter = Arc::new(RateLimiter::new(25)?);
//! let (dispatcher, queue) = Dispatcher::new(ctx, limiter, 1);
//! let run = dispatcher.spawn(Vec::new(), CancellationToken::new());
//! queue.into_stream().for_each_concurrent(10, |job| async move {
//!     println!("{} needs processing", job.key());
//! }).await;
//! # let _ = run.await;
//! # Ok(())
//! # }
//! ```

mod dispatcher;
pub mod error;
mod limiter;
mod queue;
mod report;
mod scan;

pub use crate::dispatcher::{Context, Dispatcher};
pub use crate::limiter::RateLimiter;
pub use crate::queue::{Job, JobQueue};
pub use crate::report::{RunReport, ScanOutcome, ScanReport};
