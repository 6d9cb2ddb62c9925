use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a probe context ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => f.write_str("probe cancelled"),
            CancelReason::DeadlineExceeded => f.write_str("probe deadline exceeded"),
        }
    }
}

/// Cancellation signal shared by every unit of a probe, with an optional
/// deadline.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    cancelled: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Cancels the [`ProbeContext`] it was created with, and all its clones.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        log::debug!("[context] cancel requested");
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl ProbeContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            cancelled: rx,
            deadline: None,
        }
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancelled: rx,
            deadline: None,
        };
        (ctx, CancelHandle { tx })
    }

    pub fn with_timeout(timeout: Duration) -> (Self, CancelHandle) {
        let (ctx, handle) = Self::with_cancel();
        (ctx.deadline_at(Instant::now() + timeout), handle)
    }

    /// Derives a context that also ends at `deadline`. An earlier existing
    /// deadline wins.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The reason this context has ended, if it has.
    pub fn err(&self) -> Option<CancelReason> {
        if *self.cancelled.borrow() {
            Some(CancelReason::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(CancelReason::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context is cancelled or its deadline passes. Never
    /// resolves for a context whose handle was dropped without cancelling
    /// and that has no deadline.
    pub async fn cancelled(&self) -> CancelReason {
        let mut rx = self.cancelled.clone();
        let signalled = async move {
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = signalled => CancelReason::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
                }
            }
            None => {
                signalled.await;
                CancelReason::Cancelled
            }
        }
    }
}

impl Default for ProbeContext {
    fn default() -> Self {
        Self::background()
    }
}
