use thiserror::Error as ThisError;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Per-call cancellation and deadline signal.
///
/// A `Context` is threaded explicitly through every database and storage operation. Operations
/// check it before they touch the key space and never abort once they started, so cancelling a
/// context only prevents work that has not begun yet.
///
/// Cloning is cheap, and clones observe the same cancellation.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Context {
        Context::default()
    }

    pub fn new(token: CancellationToken) -> Context {
        Context {
            token,
            deadline: None,
        }
    }

    /// Derives a child context that expires at `deadline`, or at the parent's deadline if that
    /// one comes first. Cancelling `self` also cancels the child, but not the other way around.
    pub fn with_deadline(&self, deadline: Instant) -> Context {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };

        Context {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Context {
        self.with_deadline(Instant::now() + timeout)
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

    /// Returns why the context is done, if it is. Cancellation takes precedence over an expired
    /// deadline.
    pub fn err(&self) -> Result<(), ContextError> {
        if self.token.is_cancelled() {
            return Err(ContextError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Completes once the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

#[derive(Clone, Copy, Debug, ThisError, PartialEq, Eq)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}
