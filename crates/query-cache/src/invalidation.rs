//! Lifecycle-driven invalidation
//!
//! Snapshots are only valid between the start of a unit of work (a request,
//! a job, a test case) and its end. Whoever owns the lifecycle reports the
//! end through [`CacheInvalidator::handle_event`], or holds a [`UnitOfWork`]
//! guard that does so when it goes out of scope.

use std::fmt;

/// Events that end the validity of loaded snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationEvent {
    /// The current request or job finished, successfully or not
    UnitOfWorkFinished,
    /// Explicit flush requested by the application
    Manual,
}

impl fmt::Display for InvalidationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationEvent::UnitOfWorkFinished => write!(f, "unit of work finished"),
            InvalidationEvent::Manual => write!(f, "manual"),
        }
    }
}

/// Something that drops its snapshots when told a lifecycle event happened
pub trait CacheInvalidator: Send + Sync {
    /// React to `event`, returning how many snapshots were discarded
    fn handle_event(&self, event: InvalidationEvent) -> usize;

    /// Check if the invalidator is enabled
    fn is_enabled(&self) -> bool;
}

/// Guard for one unit of work.
///
/// Invalidates when dropped, so snapshots are discarded on every exit path,
/// including early returns and unwinding.
#[must_use = "dropping the guard immediately ends the unit of work"]
pub struct UnitOfWork<'a> {
    invalidator: &'a dyn CacheInvalidator,
    finished: bool,
}

impl<'a> UnitOfWork<'a> {
    pub fn new(invalidator: &'a dyn CacheInvalidator) -> Self {
        Self {
            invalidator,
            finished: false,
        }
    }

    /// End the unit of work now and report how many snapshots were dropped
    pub fn finish(mut self) -> usize {
        self.finished = true;
        self.invalidator
            .handle_event(InvalidationEvent::UnitOfWorkFinished)
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.invalidator
                .handle_event(InvalidationEvent::UnitOfWorkFinished);
        }
    }
}

impl fmt::Debug for UnitOfWork<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("finished", &self.finished)
            .finish()
    }
}
