//! Task - a lazy, cancellable asynchronous value.
//!
//! A [`Task`] describes a computation without starting it. Forking it runs the
//! start routine and delivers exactly one of three outcomes: resolved,
//! rejected or cancelled. Tasks are immutable; every combinator returns a new
//! task that forks the previous one when it is itself forked, so a task can be
//! forked any number of times.
//!
//! # Example
//!
//! ```rust
//! use ripple::task::{Cleanup, Task};
//! use std::time::Duration;
//!
//! fn delay(ms: u64) -> Task<u64, String> {
//!     Task::new(move |settle| {
//!         let timer = tokio::spawn(async move {
//!             tokio::time::sleep(Duration::from_millis(ms)).await;
//!             settle.resolve(ms);
//!         });
//!         Cleanup::new(move || timer.abort())
//!     })
//! }
//!
//! # tokio_test::block_on(async {
//! let total = delay(5).map(|ms| ms * 2).chain(delay).to_future().await;
//! assert_eq!(total, Ok(10));
//! # });
//! ```
//!
//! # Cancellation
//!
//! [`Task::fork`] returns a [`Cancel`] handle. Cancelling before the task
//! settles runs the start routine's [`Cleanup`] once, fires the `cancelled`
//! handler if one was given, and guarantees the `resolved`/`rejected`
//! handlers never run for that fork, even if the underlying work completes
//! later.

mod collection;
mod combinators;
mod fork;
mod outcome;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;

pub use fork::{Cancel, Cleanup, ForkHandlers, Settle};
pub use outcome::Outcome;

use fork::ForkState;

type StartFn<T, E> = dyn Fn(Settle<T, E>) -> Cleanup + Send + Sync + 'static;

/// A lazy computation resolving to `T`, rejecting with `E`, or being cancelled.
pub struct Task<T, E> {
    start: Arc<StartFn<T, E>>,
}

impl<T, E> Clone for Task<T, E> {
    fn clone(&self) -> Self {
        Self {
            start: Arc::clone(&self.start),
        }
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("start", &"<function>")
            .finish()
    }
}

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a task from a start routine.
    ///
    /// The routine runs once per fork, receives the fork's [`Settle`] handle
    /// and returns the [`Cleanup`] to run if that fork is cancelled.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ripple::task::{Cleanup, Outcome, Task};
    ///
    /// let task = Task::<i32, String>::new(|settle| {
    ///     settle.resolve(3);
    ///     Cleanup::none()
    /// });
    ///
    /// # tokio_test::block_on(async {
    /// assert_eq!(task.outcome().await, Outcome::Resolved(3));
    /// # });
    /// ```
    pub fn new<F>(start: F) -> Self
    where
        F: Fn(Settle<T, E>) -> Cleanup + Send + Sync + 'static,
    {
        Self {
            start: Arc::new(start),
        }
    }

    /// A task that resolves with `value`.
    pub fn of(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Task::new(move |settle| {
            settle.resolve(value.clone());
            Cleanup::none()
        })
    }

    /// A task that rejects with `error`.
    pub fn rejected(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Task::new(move |settle| {
            settle.reject(error.clone());
            Cleanup::none()
        })
    }

    /// Adopt the outcome of a future produced by `factory`.
    ///
    /// The factory is called on every fork and the future is spawned onto the
    /// current tokio runtime; cancelling the fork aborts it. Forking therefore
    /// needs to happen inside a runtime.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ripple::task::Task;
    ///
    /// # tokio_test::block_on(async {
    /// let n = 5;
    /// let task = Task::from_future(move || async move { Ok::<_, String>(5 + n) });
    /// assert_eq!(task.to_future().await, Ok(10));
    /// # });
    /// ```
    pub fn from_future<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Task::new(move |settle| {
            let future = factory();
            let handle = tokio::spawn(async move {
                match future.await {
                    Ok(value) => settle.resolve(value),
                    Err(error) => settle.reject(error),
                }
            });
            Cleanup::new(move || handle.abort())
        })
    }

    /// Start the computation with separate rejected/resolved handlers.
    pub fn fork<R, S>(&self, on_rejected: R, on_resolved: S) -> Cancel
    where
        R: FnOnce(E) + Send + 'static,
        S: FnOnce(T) + Send + 'static,
    {
        self.fork_with(
            ForkHandlers::new()
                .on_rejected(on_rejected)
                .on_resolved(on_resolved),
        )
    }

    /// Start the computation with a full set of outcome handlers.
    pub fn fork_with(&self, handlers: ForkHandlers<T, E>) -> Cancel {
        let state = Arc::new(ForkState::new(handlers));
        let cleanup = (self.start)(Settle::new(Arc::clone(&state)));
        state.started(cleanup);
        Cancel::new(state)
    }

    /// Fork the task and wait for its three-way outcome.
    ///
    /// Dropping the returned future before it completes cancels the fork.
    pub fn outcome(&self) -> impl Future<Output = Outcome<T, E>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let send = move |outcome: Outcome<T, E>| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(outcome);
            }
        };
        let (on_rejected, on_resolved, on_cancelled) = (send.clone(), send.clone(), send);
        let cancel = self.fork_with(
            ForkHandlers::new()
                .on_rejected(move |e| on_rejected(Outcome::Rejected(e)))
                .on_resolved(move |v| on_resolved(Outcome::Resolved(v)))
                .on_cancelled(move || on_cancelled(Outcome::Cancelled)),
        );
        let guard = CancelOnDrop(Some(cancel));
        async move {
            let outcome = rx.await.unwrap_or(Outcome::Cancelled);
            guard.disarm();
            outcome
        }
    }

    /// Fork the task and adopt its result as a future.
    ///
    /// There is no mapping for cancellation: if the fork is cancelled (for
    /// example by the start routine itself) the returned future never
    /// completes.
    pub fn to_future(&self) -> impl Future<Output = Result<T, E>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let (reject_tx, resolve_tx) = (Arc::clone(&tx), tx);
        self.fork(
            move |e| {
                if let Some(tx) = reject_tx.lock().take() {
                    let _ = tx.send(Err(e));
                }
            },
            move |v| {
                if let Some(tx) = resolve_tx.lock().take() {
                    let _ = tx.send(Ok(v));
                }
            },
        );
        async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => futures::future::pending().await,
            }
        }
    }
}

/// Cancels the wrapped fork when dropped, unless disarmed first.
pub(crate) struct CancelOnDrop(pub(crate) Option<Cancel>);

impl CancelOnDrop {
    pub(crate) fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(cancel) = self.0.take() {
            cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests;
