//! Resolve context and provider traits
//!
//! These let callers cancel a pass, bound it with a deadline and observe
//! it, without the resolver depending on a particular UI or runtime.

use crate::error::ReferenceError;
use crate::types::{Address, ResourceId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared cancellation flag
///
/// Clones observe the same flag, so a signal handler or a supervising
/// thread can hold one clone while the resolver holds another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every pass observing this token
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a pass stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The caller cancelled
    Cancelled,
    /// The deadline passed
    TimedOut,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Caller-supplied cancellation and timeout for one resolution pass
///
/// Passed down to every [`OutputStore::get`](crate::OutputStore::get)
/// call. Stores that block on I/O should call [`ResolveContext::check`]
/// before doing so.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl ResolveContext {
    /// A context that never interrupts
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `token` for cancellation
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Stop the pass once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop the pass `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The cancellation token this context observes
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// `Err` if the pass should stop now
    pub fn check(&self) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Interrupt::TimedOut);
        }
        Ok(())
    }
}

/// Progress callback for resolution passes
///
/// Called from rayon workers, hence `Sync` and `&self`.
pub trait ResolveProgress: Sync {
    /// Called once the walk has found `references` reference nodes
    /// addressing `resources` distinct resources
    fn on_pass_start(&self, references: usize, resources: usize);

    /// Called when a store fetch for `id` starts
    fn on_fetch_start(&self, id: &ResourceId);

    /// Called when a store fetch for `id` finishes
    fn on_fetch_complete(&self, id: &ResourceId, found: bool);

    /// Called when a reference was substituted by a literal
    fn on_resolved(&self, path: &str, address: &Address);

    /// Called when a reference failed
    fn on_failed(&self, error: &ReferenceError);

    /// Called when the pass is over, successful or not
    fn on_pass_complete(&self);
}

/// No-op progress callback
pub struct NoProgress;

impl ResolveProgress for NoProgress {
    fn on_pass_start(&self, _references: usize, _resources: usize) {}
    fn on_fetch_start(&self, _id: &ResourceId) {}
    fn on_fetch_complete(&self, _id: &ResourceId, _found: bool) {}
    fn on_resolved(&self, _path: &str, _address: &Address) {}
    fn on_failed(&self, _error: &ReferenceError) {}
    fn on_pass_complete(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_never_interrupts() {
        assert_eq!(ResolveContext::new().check(), Ok(()));
        assert!(ResolveContext::new().remaining().is_none());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let ctx = ResolveContext::new().with_cancel(token.clone());
        assert_eq!(ctx.check(), Ok(()));
        token.cancel();
        assert_eq!(ctx.check(), Err(Interrupt::Cancelled));
        assert!(ctx.cancel_token().is_cancelled());
    }

    #[test]
    fn test_deadline_in_past_times_out() {
        let ctx = ResolveContext::new().with_timeout(Duration::ZERO);
        assert_eq!(ctx.check(), Err(Interrupt::TimedOut));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_cancel_wins_over_deadline() {
        let token = CancelToken::new();
        token.cancel();
        let ctx = ResolveContext::new()
            .with_cancel(token)
            .with_timeout(Duration::ZERO);
        assert_eq!(ctx.check(), Err(Interrupt::Cancelled));
    }

    #[test]
    fn test_far_deadline_passes() {
        let ctx = ResolveContext::new().with_timeout(Duration::from_secs(3600));
        assert_eq!(ctx.check(), Ok(()));
        assert!(ctx.remaining().is_some_and(|r| r > Duration::from_secs(3500)));
    }
}
