use std::{future::Future, time::Duration};

/// A future paired with an upper bound on how long a caller is willing to wait for it.
///
/// Nothing inside yup enforces deadlines on the supervised tool; this is for callers (and tests)
/// that want one around a whole supervised run.
pub struct TimeoutFuture<F: Future> {
    fut: F,
    timeout: Duration,
}

impl<F: Future> TimeoutFuture<F> {
    pub fn new(fut: F, timeout: Duration) -> Self {
        Self { fut, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits for the future to complete. Returns [None] if the deadline passes first, in which
    /// case the inner future is dropped.
    ///
    /// **Not** cancel-safe.
    pub async fn wait(self) -> Option<F::Output> {
        tokio::select! {
            r = self.fut => Some(r),
            _ = tokio::time::sleep(self.timeout) => None,
        }
    }
}

pub trait WithTimeout: Future + Sized {
    fn with_timeout(self, timeout: Duration) -> TimeoutFuture<Self> {
        TimeoutFuture::new(self, timeout)
    }
}

impl<F: Future> WithTimeout for F {}
