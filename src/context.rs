//! Per-call cancellation and deadline.
//!
//! A [`CallContext`] travels with every repository call. The engine checks it before
//! each store round-trip, and executors that can wait asynchronously (see
//! [`MayPostgresExecutor`](crate::executor::MayPostgresExecutor)) abandon an in-flight
//! round-trip as soon as it fires.

use crate::error::{QuarryError, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl CallContext {
    /// A context that never cancels and never times out.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set the deadline, keeping the earlier one if a deadline is already set.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether this context can ever fire.
    pub fn can_interrupt(&self) -> bool {
        self.deadline.is_some() || self.cancel.is_some()
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_canceled)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The interruption to report, if the context has fired.
    pub fn interruption(&self) -> Option<StoreError> {
        if self.is_canceled() {
            Some(StoreError::canceled())
        } else if self.is_expired() {
            Some(StoreError::timeout())
        } else {
            None
        }
    }

    /// Fail with `Canceled`/`Timeout` if the context has fired.
    pub fn check(&self) -> Result<(), QuarryError> {
        if self.is_canceled() {
            return Err(QuarryError::Canceled);
        }
        if self.is_expired() {
            return Err(QuarryError::Timeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_never_fires() {
        let ctx = CallContext::background();
        assert!(ctx.check().is_ok());
        assert_eq!(ctx.remaining(), None);
        assert!(!ctx.can_interrupt());
        assert!(ctx.with_timeout(Duration::from_secs(1)).can_interrupt());
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let ctx = CallContext::background().with_cancel(token.clone());
        assert!(ctx.check().is_ok());
        token.cancel();
        assert_eq!(ctx.check(), Err(QuarryError::Canceled));
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let ctx = CallContext::background().with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(ctx.check(), Err(QuarryError::Timeout));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let soon = Instant::now() + Duration::from_secs(1);
        let later = Instant::now() + Duration::from_secs(60);
        let ctx = CallContext::background().with_deadline(soon).with_deadline(later);
        assert_eq!(ctx.deadline(), Some(soon));
    }
}
