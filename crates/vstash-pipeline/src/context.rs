//! Run context: one deadline and one cancellation signal shared by every
//! backend call of a pipeline run

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use vstash_version::BackendError;

/// Cancels every [`RunContext`] cloned from the one it was created with
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Signal cancellation
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Deadline and cancellation for one pipeline run
#[derive(Debug, Clone)]
pub struct RunContext {
    deadline: Option<Instant>,
    cancelled: watch::Receiver<bool>,
}

impl RunContext {
    /// Cancellable context without a deadline
    #[must_use]
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            deadline: None,
            cancelled: rx,
        };
        (ctx, CancelHandle { tx: Arc::new(tx) })
    }

    /// Context that is never cancelled and has no deadline
    #[must_use]
    pub fn background() -> Self {
        Self::new().0
    }

    /// With a deadline `timeout` from now
    #[inline]
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// With an absolute deadline
    #[inline]
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline, if any
    #[inline]
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether cancellation has been signalled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Drive `call` unless the run is cancelled or the deadline passes first
    ///
    /// # Errors
    /// `BackendError::Cancelled`, `BackendError::Timeout`, or the call's own
    /// error
    pub async fn run<T, F>(&self, call: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        if self.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(BackendError::Timeout);
        }

        let mut cancelled = self.cancelled.clone();
        let cancel = async move {
            // sender gone: nobody can cancel any more
            if cancelled.wait_for(|c| *c).await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancel => Err(BackendError::Cancelled),
            () = deadline => Err(BackendError::Timeout),
            out = call => out,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::background()
    }
}
