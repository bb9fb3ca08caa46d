//! Cancellation and deadlines for API calls.
//!
//! A [`Context`] is passed as the first argument of every operation. When it
//! is cancelled or its deadline passes, the in-flight transport future is
//! dropped and the call fails with [`ApiError::Cancelled`] or
//! [`ApiError::DeadlineExceeded`].
//!
//! Derived contexts keep every signal of their parent and the earlier of the
//! two deadlines, so cancelling a parent also ends all of its children.

use std::future::pending;
use std::time::Duration;

use futures::future::select_all;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    signals: Vec<watch::Receiver<bool>>,
}

/// Cancels the context returned alongside it by [`Context::with_cancel`].
///
/// Dropping the handle without calling [`CancelHandle::cancel`] leaves the
/// context running.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Context {
    /// A context that never ends.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        let mut child = self.clone();
        child.signals.push(receiver);
        (child, CancelHandle { sender })
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.clone();
        child.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        child
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The reason this context has ended, or `None` while it is live.
    pub fn err(&self) -> Option<ApiError> {
        if self.signals.iter().any(|signal| *signal.borrow()) {
            return Some(ApiError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ApiError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context ends, yielding the reason.
    pub async fn done(&self) -> ApiError {
        let cancelled = async {
            if self.signals.is_empty() {
                pending::<()>().await;
            }
            let waits = self.signals.iter().cloned().map(|mut signal| {
                Box::pin(async move {
                    let closed = signal.wait_for(|cancelled| *cancelled).await.is_err();
                    if closed {
                        // The handle is gone without cancelling: never fires.
                        pending::<()>().await;
                    }
                })
            });
            select_all(waits).await;
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => ApiError::Cancelled,
            () = expired => ApiError::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_live() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        assert!(ctx.deadline().is_none());
    }

    #[tokio::test]
    async fn cancel_ends_context_and_children() {
        let (parent, handle) = Context::background().with_cancel();
        let child = parent.with_timeout(Duration::from_secs(60));
        handle.cancel();
        assert!(matches!(parent.err(), Some(ApiError::Cancelled)));
        assert!(matches!(child.err(), Some(ApiError::Cancelled)));
        assert!(matches!(child.done().await, ApiError::Cancelled));
    }

    #[tokio::test]
    async fn child_keeps_earlier_deadline() {
        let parent = Context::background().with_timeout(Duration::from_millis(10));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn deadline_resolves_done() {
        let ctx = Context::background().with_timeout(Duration::from_millis(10));
        assert!(matches!(ctx.done().await, ApiError::DeadlineExceeded));
        assert!(matches!(ctx.err(), Some(ApiError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn cancel_from_another_task() {
        let (ctx, handle) = Context::background().with_cancel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });
        assert!(matches!(ctx.done().await, ApiError::Cancelled));
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (ctx, handle) = Context::background().with_cancel();
        drop(handle);
        let ctx = ctx.with_timeout(Duration::from_millis(10));
        assert!(ctx.err().is_none());
        assert!(matches!(ctx.done().await, ApiError::DeadlineExceeded));
    }
}
