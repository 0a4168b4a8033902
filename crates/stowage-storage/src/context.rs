//! Cancellation and deadlines for blocking storage operations.

use crate::traits::{StorageError, StorageResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation signal and optional deadline threaded through `save` and
/// `delete`.
///
/// Cloning shares the same token, so cancelling any clone cancels them all.
///
/// Cancellation stops the wait, not work already handed to the OS: a local
/// write that has started may still finish on its blocking thread. Local
/// saves write to a temporary file and rename it into place, so an
/// abandoned save never leaves a partial object under the final name.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Bind to an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        RequestContext {
            token,
            deadline: None,
        }
    }

    /// Fail operations that have not finished `timeout` from now. An earlier
    /// deadline already on the context is kept. A timeout too large to
    /// represent adds no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let Some(candidate) = Instant::now().checked_add(timeout) else {
            return self;
        };
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    /// A context cancelled together with `self`, which can also be cancelled
    /// on its own without affecting `self`.
    pub fn child(&self) -> Self {
        RequestContext {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `fut` unless the context is cancelled or its deadline passes
    /// first. A context that is already done never polls `fut`.
    pub(crate) async fn run<F, T>(&self, operation: &'static str, fut: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        if self.token.is_cancelled() {
            return Err(StorageError::Cancelled { operation });
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(StorageError::DeadlineExceeded { operation });
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StorageError::Cancelled { operation }),
            _ = deadline => Err(StorageError::DeadlineExceeded { operation }),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let ctx = RequestContext::background();
        let value = ctx.run("save", async { Ok::<_, StorageError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancelled_context_never_polls_operation() {
        let ctx = RequestContext::background();
        ctx.cancel();

        let polled = AtomicBool::new(false);
        let result = ctx
            .run("delete", async {
                polled.store(true, Ordering::SeqCst);
                Ok::<(), StorageError>(())
            })
            .await;

        assert!(matches!(
            result,
            Err(StorageError::Cancelled { operation: "delete" })
        ));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn deadline_interrupts_slow_operation() {
        let ctx = RequestContext::background().with_timeout(Duration::from_millis(20));
        let result = ctx
            .run("save", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<(), StorageError>(())
            })
            .await;

        assert!(matches!(
            result,
            Err(StorageError::DeadlineExceeded { operation: "save" })
        ));
    }

    #[tokio::test]
    async fn expired_deadline_never_polls_operation() {
        let ctx = RequestContext::background().with_timeout(Duration::ZERO);

        let polled = AtomicBool::new(false);
        let result = ctx
            .run("save", async {
                polled.store(true, Ordering::SeqCst);
                Ok::<(), StorageError>(())
            })
            .await;

        assert!(matches!(
            result,
            Err(StorageError::DeadlineExceeded { operation: "save" })
        ));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[test]
    fn oversized_timeout_adds_no_deadline() {
        let ctx = RequestContext::background().with_timeout(Duration::from_secs(u64::MAX));
        assert!(ctx.deadline().is_none());

        let bounded = RequestContext::background()
            .with_timeout(Duration::from_secs(5))
            .with_timeout(Duration::MAX);
        assert!(bounded.deadline().is_some());
    }

    #[test]
    fn with_timeout_keeps_earlier_deadline() {
        let ctx = RequestContext::background().with_timeout(Duration::from_secs(1));
        let first = ctx.deadline().unwrap();
        let ctx = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(first));
    }

    #[test]
    fn child_follows_parent_cancellation() {
        let parent = RequestContext::background();
        let child = parent.child();

        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }
}
