//! Cooperative cancellation for async suppliers.

use crate::core::ActionError;
use crate::sync::lock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Cancellation signal handed to every async supplier.
///
/// Suppliers are never interrupted. A token only tells a supplier that its
/// result is going to be dropped, either because the owning actor was
/// disposed or because the configured async timeout elapsed, so that
/// long-running work can stop early. [`CancelToken::wait`] sleeps but wakes
/// up as soon as the token is cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    signal: Arc<Signal>,
    deadline: Option<Instant>,
}

#[derive(Debug, Default)]
struct Signal {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

impl CancelToken {
    /// Create a token that is not cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a token sharing this token's signal with an optional deadline
    /// counted from now. A timeout too large to represent means no deadline.
    pub(crate) fn child(&self, timeout: Option<Duration>) -> Self {
        Self {
            signal: Arc::clone(&self.signal),
            deadline: timeout.and_then(|t| Instant::now().checked_add(t)),
        }
    }

    /// Cancel this token and every token derived from the same source.
    pub fn cancel(&self) {
        let _guard = lock(&self.signal.lock);
        self.signal.cancelled.store(true, Ordering::SeqCst);
        self.signal.wake.notify_all();
    }

    /// Wake every thread parked on this token's signal so it re-checks its
    /// condition.
    pub(crate) fn wake(&self) {
        let _guard = lock(&self.signal.lock);
        self.signal.wake.notify_all();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.signal.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the deadline attached to this token has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with [`ActionError::Cancelled`] if the result of the current
    /// supplier would be dropped anyway.
    pub fn check(&self) -> Result<(), ActionError> {
        if self.is_cancelled() || self.is_expired() {
            Err(ActionError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, returning early with [`ActionError::Cancelled`]
    /// when the token is cancelled or its deadline passes first.
    pub fn wait(&self, duration: Duration) -> Result<(), ActionError> {
        let until = Instant::now().checked_add(duration);
        self.park(until, || {
            until
                .is_some_and(|until| Instant::now() >= until)
                .then_some(())
        })
    }

    /// Block until `ready` yields a value or the token is cancelled or
    /// expires. A timed wait never sleeps past `until`, so `ready` may
    /// depend on the clock.
    ///
    /// `ready` runs with the signal lock held, so a producer that calls
    /// [`wake`](Self::wake) after publishing is never missed.
    pub(crate) fn park<T>(
        &self,
        until: Option<Instant>,
        mut ready: impl FnMut() -> Option<T>,
    ) -> Result<T, ActionError> {
        let bound = match (until, self.deadline) {
            (Some(until), Some(deadline)) => Some(until.min(deadline)),
            (until, deadline) => until.or(deadline),
        };

        let mut guard = lock(&self.signal.lock);
        loop {
            self.check()?;
            if let Some(value) = ready() {
                return Ok(value);
            }
            guard = match bound {
                None => self
                    .signal
                    .wake
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(bound) => {
                    let left = bound.saturating_duration_since(Instant::now());
                    match self.signal.wake.wait_timeout(guard, left) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
            };
        }
    }
}
