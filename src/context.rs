use std::future::{self, Future};
use std::time::Duration;

use tokio::time::{self as tokio_time, Instant};
use tokio_util::sync::CancellationToken;

/// Why a [`CallContext`] stopped an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation and deadline scope for a single client call.
///
/// Network round trips and retry sleeps race against the context; whichever
/// ends first wins.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never expires on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `token` as the cancellation source.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Derives a child context expiring after `timeout` or at the current
    /// deadline, whichever is earlier. Cancelling the child leaves `self`
    /// untouched.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };

        Self {
            cancellation: self.cancellation.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns the reason the context has ended, if it has.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancellation.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drives `future` to completion unless the context ends first.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio_time::sleep_until(deadline).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(ContextError::Canceled),
            () = expired => Err(ContextError::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{self as tokio_time, Instant};

    use super::{CallContext, ContextError};

    #[tokio::test]
    async fn run_completes_without_deadline() {
        let ctx = CallContext::new();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
        assert!(ctx.err().is_none());
    }

    #[tokio::test]
    async fn cancelled_context_fails_fast() {
        let ctx = CallContext::new();
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
        assert_eq!(ctx.run(async { 7 }).await, Err(ContextError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_pending_sleep() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(50));
        let result = ctx.run(tokio_time::sleep(Duration::from_secs(60))).await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn child_keeps_earlier_deadline_and_parent_survives_cancel() {
        let parent = CallContext::new().with_timeout(Duration::from_millis(10));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
        assert!(child.deadline().expect("deadline") <= Instant::now() + Duration::from_millis(10));

        child.cancel();
        assert_eq!(child.err(), Some(ContextError::Canceled));
        assert_ne!(parent.err(), Some(ContextError::Canceled));
    }

    #[test]
    fn error_messages_name_the_reason() {
        assert_eq!(ContextError::Canceled.to_string(), "context canceled");
        assert_eq!(ContextError::DeadlineExceeded.to_string(), "context deadline exceeded");
    }
}
