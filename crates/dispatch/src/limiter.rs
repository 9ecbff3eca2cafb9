use crate::error::{ErrorKind, Result};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

// Refill arithmetic is done in floating point; treat "almost one token" as one.
const EPSILON: f64 = 1e-9;

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Token bucket bounding how fast repository scans are started.
///
/// Holds at most `per_second` tokens (the burst) and refills at `per_second`
/// tokens per second. The bucket starts full, so the first `per_second`
/// acquisitions succeed immediately. Time is read from the tokio clock.
pub struct RateLimiter {
    per_second: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(per_second: u32) -> Result<Self> {
        if per_second == 0 {
            exn::bail!(ErrorKind::InvalidRate(per_second));
        }
        let per_second = f64::from(per_second);
        Ok(Self {
            per_second,
            bucket: Mutex::new(Bucket {
                tokens: per_second,
                refilled_at: Instant::now(),
            }),
        })
    }

    /// Take one token, waiting until one is available.
    ///
    /// Fails with [`ErrorKind::Cancelled`] as soon as `cancel` fires, without
    /// consuming a token. An already-cancelled token fails immediately even if
    /// tokens are available.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                exn::bail!(ErrorKind::Cancelled);
            }
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.saturating_duration_since(bucket.refilled_at).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.per_second);
                bucket.refilled_at = now;
                if bucket.tokens + EPSILON >= 1.0 {
                    bucket.tokens = (bucket.tokens - 1.0).max(0.0);
                    return Ok(());
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.per_second)
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => exn::bail!(ErrorKind::Cancelled),
                _ = tokio::time::sleep(wait) => {},
            }
        }
    }
}
