//! Cancellation and deadline propagation for blocking operations.

use std::future::Future;
use std::time::Duration;

use futures::future::pending;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// A cancellation/deadline context threaded through every blocking call.
///
/// A context is a cheap value: cloning it shares the same cancellation
/// signal and deadline. Operations given a context return promptly with
/// [`Error::Cancelled`] or [`Error::DeadlineExceeded`] instead of waiting
/// for the wrapped driver call once the context fires.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use mongo_veneer::Context;
///
/// let ctx = Context::with_timeout(Duration::from_secs(2));
/// let result = collection.find_one(&ctx, doc! { "name": "John" }).await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Absolute point after which operations abort.
    deadline: Option<Instant>,
    /// Cancellation signal shared by clones of this context.
    cancel: Option<watch::Receiver<bool>>,
}

impl Context {
    /// Create a context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Create a context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Create a context expiring at an absolute instant.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Attach a cancellation signal, returning the context and the handle
    /// that fires it. Replaces any signal the context already carried.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (ctx, canceller) = Context::background().cancellable();
    /// tokio::spawn(async move { canceller.cancel() });
    /// ```
    pub fn cancellable(mut self) -> (Self, Canceller) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, Canceller { tx })
    }

    /// Get the deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check whether the context has already been cancelled or expired.
    pub fn is_cancelled(&self) -> bool {
        let signalled = self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false);
        let expired = self.deadline.map(|at| Instant::now() >= at).unwrap_or(false);
        signalled || expired
    }

    /// Run a future under this context, aborting it when the context fires.
    ///
    /// Cancellation wins over the deadline, and both win over the wrapped
    /// future; an already-fired context aborts before the future is polled.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        // sleep_until with a past deadline is not ready on its first poll,
        // so an already-fired context must be caught before selecting.
        if self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false) {
            return Err(Error::Cancelled);
        }
        if self.deadline.map(|at| Instant::now() >= at).unwrap_or(false) {
            return Err(Error::DeadlineExceeded);
        }
        tokio::select! {
            biased;
            _ = cancelled_signal(self.cancel.clone()) => Err(Error::Cancelled),
            _ = deadline_elapsed(self.deadline) => Err(Error::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

/// Fires the cancellation signal for all contexts cloned from one
/// [`Context::cancellable`] call.
///
/// Dropping a `Canceller` without calling [`cancel`](Canceller::cancel)
/// never cancels anything; the signal simply can no longer arrive.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    /// Cancel every context sharing this signal. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Resolve when the signal fires; never resolve without a signal.
async fn cancelled_signal(rx: Option<watch::Receiver<bool>>) {
    match rx {
        Some(mut rx) => {
            if *rx.borrow() {
                return;
            }
            loop {
                if rx.changed().await.is_err() {
                    // Canceller dropped unfired; cancellation can no longer arrive.
                    pending::<()>().await;
                }
                if *rx.borrow() {
                    return;
                }
            }
        }
        None => pending().await,
    }
}

/// Resolve when the deadline passes; never resolve without a deadline.
async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = Context::background();
        let out = ctx.run(async { 7 }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_run_aborts_without_polling() {
        let (ctx, canceller) = Context::background().cancellable();
        canceller.cancel();

        let err = ctx.run(pending::<()>()).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_inflight_run() {
        let (ctx, canceller) = Context::background().cancellable();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = ctx.run(pending::<()>()).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_beats_slow_future() {
        let ctx = Context::with_timeout(Duration::from_millis(100));
        let err = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
        assert!(err.is_cancellation());
    }

    #[tokio::test]
    async fn test_expired_deadline_aborts_ready_future() {
        let ctx = Context::with_timeout(Duration::ZERO);
        let err = ctx.run(async { 7 }).await.unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_expired_deadline_aborts_without_polling() {
        let ctx = Context::with_timeout(Duration::ZERO);
        let err = ctx
            .run::<_, i32>(async { unreachable!("work must not be polled") })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_future_beats_deadline() {
        let ctx = Context::with_timeout(Duration::from_secs(10));
        let out = ctx.run(async { 42 }).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn test_clones_share_cancellation() {
        let (ctx, canceller) = Context::background().cancellable();
        let cloned = ctx.clone();

        assert!(!cloned.is_cancelled());
        canceller.cancel();
        assert!(ctx.is_cancelled());
        assert!(cloned.is_cancelled());
    }

    #[tokio::test]
    async fn test_is_cancelled_tracks_deadline() {
        assert!(!Context::background().is_cancelled());
        assert!(Context::with_timeout(Duration::ZERO).is_cancelled());
    }

    #[tokio::test]
    async fn test_deadline_accessor() {
        assert!(Context::background().deadline().is_none());
        assert!(Context::with_timeout(Duration::from_secs(1))
            .deadline()
            .is_some());
    }
}
