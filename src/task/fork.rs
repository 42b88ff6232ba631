//! Fork-time machinery: settlement handles, cleanup callbacks and cancellation.
//!
//! Every call to [`Task::fork_with`](super::Task::fork_with) creates one
//! `ForkState`. It moves through `Starting -> Running -> {Settled | Cancelled}`
//! and never leaves a terminal phase, so each fork delivers at most one
//! outcome and runs its cleanup at most once.

use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

/// Cleanup returned by a task's start routine.
///
/// Invoked exactly once if the fork is cancelled before it settles, and
/// dropped without being called otherwise.
pub struct Cleanup(Option<Box<dyn FnOnce() + Send + 'static>>);

impl Cleanup {
    /// A start routine with nothing to release.
    pub fn none() -> Self {
        Cleanup(None)
    }

    /// Run `f` if the fork is cancelled.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Cleanup(Some(Box::new(f)))
    }

    pub(crate) fn run(self) {
        if let Some(f) = self.0 {
            f();
        }
    }
}

impl Default for Cleanup {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cleanup")
            .field(&self.0.as_ref().map(|_| "<function>"))
            .finish()
    }
}

type Callback<A> = Box<dyn FnOnce(A) + Send + 'static>;

/// Outcome handlers supplied when forking a task.
///
/// Any handler left out is a no-op.
///
/// # Example
///
/// ```rust
/// use ripple::task::{ForkHandlers, Task};
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(None));
/// let slot = seen.clone();
///
/// Task::<i32, String>::of(5).fork_with(
///     ForkHandlers::new().on_resolved(move |v| *slot.lock().unwrap() = Some(v)),
/// );
/// assert_eq!(*seen.lock().unwrap(), Some(5));
/// ```
pub struct ForkHandlers<T, E> {
    rejected: Option<Callback<E>>,
    resolved: Option<Callback<T>>,
    cancelled: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl<T, E> ForkHandlers<T, E> {
    /// No handlers at all.
    pub fn new() -> Self {
        Self {
            rejected: None,
            resolved: None,
            cancelled: None,
        }
    }

    /// Called with the rejection value.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: FnOnce(E) + Send + 'static,
    {
        self.rejected = Some(Box::new(f));
        self
    }

    /// Called with the resolved value.
    pub fn on_resolved<F>(mut self, f: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.resolved = Some(Box::new(f));
        self
    }

    /// Called once if the fork is cancelled before settling.
    pub fn on_cancelled<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancelled = Some(Box::new(f));
        self
    }
}

impl<T, E> Default for ForkHandlers<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for ForkHandlers<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkHandlers")
            .field("rejected", &self.rejected.is_some())
            .field("resolved", &self.resolved.is_some())
            .field("cancelled", &self.cancelled.is_some())
            .finish()
    }
}

enum Phase {
    Starting,
    Running(Cleanup),
    Settled,
    Cancelled,
}

pub(crate) struct ForkState<T, E> {
    phase: Mutex<Phase>,
    handlers: Mutex<ForkHandlers<T, E>>,
}

impl<T, E> ForkState<T, E> {
    pub(crate) fn new(handlers: ForkHandlers<T, E>) -> Self {
        Self {
            phase: Mutex::new(Phase::Starting),
            handlers: Mutex::new(handlers),
        }
    }

    /// Record the cleanup returned by the start routine.
    pub(crate) fn started(&self, cleanup: Cleanup) {
        let late = {
            let mut phase = self.phase.lock();
            match *phase {
                Phase::Starting => {
                    *phase = Phase::Running(cleanup);
                    None
                }
                // Cancelled from inside the start routine: the cleanup was not
                // available yet, so it runs now.
                Phase::Cancelled => Some(cleanup),
                Phase::Settled | Phase::Running(_) => None,
            }
        };
        if let Some(cleanup) = late {
            cleanup.run();
        }
    }

    fn try_settle(&self) -> bool {
        let previous = {
            let mut phase = self.phase.lock();
            match *phase {
                Phase::Starting | Phase::Running(_) => mem::replace(&mut *phase, Phase::Settled),
                Phase::Settled | Phase::Cancelled => return false,
            }
        };
        drop(previous);
        true
    }

    fn take_handlers(&self) -> ForkHandlers<T, E> {
        mem::take(&mut *self.handlers.lock())
    }

    pub(crate) fn resolve(&self, value: T) {
        if self.try_settle() {
            if let Some(f) = self.take_handlers().resolved {
                f(value);
            }
        }
    }

    pub(crate) fn reject(&self, error: E) {
        if self.try_settle() {
            if let Some(f) = self.take_handlers().rejected {
                f(error);
            }
        }
    }

    pub(crate) fn cancel(&self) {
        let cleanup = {
            let mut phase = self.phase.lock();
            match mem::replace(&mut *phase, Phase::Cancelled) {
                Phase::Running(cleanup) => Some(cleanup),
                Phase::Starting => None,
                Phase::Settled => {
                    *phase = Phase::Settled;
                    return;
                }
                Phase::Cancelled => return,
            }
        };
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }
        if let Some(f) = self.take_handlers().cancelled {
            f();
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(*self.phase.lock(), Phase::Starting | Phase::Running(_))
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(*self.phase.lock(), Phase::Cancelled)
    }
}

/// The `reject` / `resolve` / self-`cancel` callbacks handed to a start routine.
///
/// Cloneable so it can be moved into timers, spawned futures or callbacks.
/// Only the first call to any of its methods has an effect.
pub struct Settle<T, E> {
    state: Arc<ForkState<T, E>>,
}

impl<T, E> Settle<T, E> {
    pub(crate) fn new(state: Arc<ForkState<T, E>>) -> Self {
        Self { state }
    }

    /// Settle the fork as rejected.
    pub fn reject(&self, error: E) {
        self.state.reject(error);
    }

    /// Settle the fork as resolved.
    pub fn resolve(&self, value: T) {
        self.state.resolve(value);
    }

    /// Cancel the fork from inside its own computation.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Returns true until the fork settles or is cancelled.
    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Returns true once the fork has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

impl<T, E> Clone for Settle<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> fmt::Debug for Settle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settle")
            .field("pending", &self.is_pending())
            .finish()
    }
}

trait Cancellable: Send + Sync {
    fn cancel(&self);
}

impl<T, E> Cancellable for ForkState<T, E> {
    fn cancel(&self) {
        ForkState::cancel(self);
    }
}

/// Cancels one fork of a task.
///
/// Dropping a `Cancel` does not cancel anything.
#[derive(Clone)]
pub struct Cancel {
    target: Arc<dyn Cancellable>,
}

impl Cancel {
    pub(crate) fn new<T: 'static, E: 'static>(state: Arc<ForkState<T, E>>) -> Self {
        Self { target: state }
    }

    /// Cancel the fork. No-op once it has settled or was already cancelled.
    pub fn cancel(&self) {
        self.target.cancel();
    }
}

impl fmt::Debug for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancel").finish_non_exhaustive()
    }
}

/// A set of forks cancelled together.
#[derive(Clone, Default)]
pub(crate) struct CancelGroup {
    members: Arc<Mutex<Vec<Cancel>>>,
}

impl CancelGroup {
    pub(crate) fn push(&self, cancel: Cancel) {
        self.members.lock().push(cancel);
    }

    pub(crate) fn cancel_all(&self) {
        let members = mem::take(&mut *self.members.lock());
        for member in members {
            member.cancel();
        }
    }
}
