//! Cancellation and deadline propagation for calls.
//!
//! A [`CancellationToken`] forms a tree: cancelling a token is observed by all
//! of its descendants, never by its ancestors. The server owns the root token,
//! each accepted connection receives a child, and each request context derives
//! from its connection. [`CallContext`] pairs a token with an optional
//! deadline and is handed to handlers through the request envelope.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Shared cancellation flag linked to its ancestors.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    node: Arc<TokenNode>,
}

#[derive(Debug, Default)]
struct TokenNode {
    cancelled: AtomicBool,
    parent: Option<Arc<TokenNode>>,
}

impl CancellationToken {
    /// Creates a root token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is cancelled whenever `self` is.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            node: Arc::new(TokenNode {
                cancelled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.node)),
            }),
        }
    }

    /// Cancels this token and every token derived from it.
    ///
    /// Cancelling an already cancelled token has no further effect.
    pub fn cancel(&self) {
        self.node.cancelled.store(true, Ordering::SeqCst);
    }

    /// Reports whether this token or any ancestor has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let mut current = Some(&self.node);
        while let Some(node) = current {
            if node.cancelled.load(Ordering::SeqCst) {
                return true;
            }
            current = node.parent.as_ref();
        }
        false
    }
}

/// Reason a context is no longer usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context, or one of its ancestors, was cancelled.
    #[error("context cancelled")]
    Cancelled,
    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Call-scoped cancellation token plus optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context with a fresh root token and no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Context bound to an existing token.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets an absolute deadline, keeping the earlier one if already set.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Sets a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a context that is cancelled with this one and shares its deadline.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and all contexts derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Underlying cancellation token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Absolute deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when no deadline is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Reports whether the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reports whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns why the context is done, or `None` while it is still live.
    ///
    /// Cancellation takes precedence over an expired deadline.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            Some(ContextError::Cancelled)
        } else if self.is_expired() {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_observes_parent_cancellation() {
        let root = CancellationToken::new();
        let child = root.child();
        let grandchild = child.child();
        assert!(!grandchild.is_cancelled());

        root.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn parent_ignores_child_cancellation() {
        let root = CancellationToken::new();
        let child = root.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());
    }

    #[test]
    fn repeated_cancel_is_harmless() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn deadline_keeps_earliest_value() {
        let now = Instant::now();
        let early = now + Duration::from_secs(1);
        let late = now + Duration::from_secs(10);
        let context = CallContext::background()
            .with_deadline(early)
            .with_deadline(late);
        assert_eq!(context.deadline(), Some(early));
    }

    #[test]
    fn expired_deadline_reports_error() {
        let context = CallContext::background().with_deadline(Instant::now());
        assert!(context.is_expired());
        assert_eq!(context.err(), Some(ContextError::DeadlineExceeded));
        assert_eq!(context.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn cancellation_wins_over_deadline() {
        let context = CallContext::background().with_deadline(Instant::now());
        context.cancel();
        assert_eq!(context.err(), Some(ContextError::Cancelled));
    }

    #[test]
    fn background_context_is_live() {
        let context = CallContext::background();
        assert_eq!(context.err(), None);
        assert_eq!(context.remaining(), None);
    }
}
