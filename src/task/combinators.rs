//! Transformations producing new tasks from existing ones.
//!
//! Each combinator wraps its upstream: forking the result forks the upstream
//! with handlers that translate its outcome, and cancelling the result cancels
//! the upstream fork. Upstream cancellation always propagates downstream.

use std::sync::Arc;

use parking_lot::Mutex;

use super::fork::{Cancel, Cleanup, ForkHandlers, Settle};
use super::Task;

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Build a task that forks `self` with handlers produced per fork.
    fn derive<U, F, H>(&self, handlers: H) -> Task<U, F>
    where
        U: Send + 'static,
        F: Send + 'static,
        H: Fn(Settle<U, F>) -> ForkHandlers<T, E> + Send + Sync + 'static,
    {
        let upstream = self.clone();
        Task::new(move |settle: Settle<U, F>| {
            let downstream = settle.clone();
            let cancel = upstream
                .fork_with(handlers(settle).on_cancelled(move || downstream.cancel()));
            Cleanup::new(move || cancel.cancel())
        })
    }

    /// Transform the resolved value. Rejections pass through untouched.
    ///
    /// ```rust
    /// use ripple::task::Task;
    ///
    /// # tokio_test::block_on(async {
    /// let task = Task::<i32, String>::of(5).map(|x| x * 2);
    /// assert_eq!(task.to_future().await, Ok(10));
    /// # });
    /// ```
    pub fn map<U, M>(&self, f: M) -> Task<U, E>
    where
        U: Send + 'static,
        M: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.derive(move |settle: Settle<U, E>| {
            let f = Arc::clone(&f);
            let rejected = settle.clone();
            ForkHandlers::new()
                .on_rejected(move |e| rejected.reject(e))
                .on_resolved(move |v| settle.resolve(f(v)))
        })
    }

    /// Transform the rejection value. Resolutions pass through untouched.
    pub fn map_rejected<F, M>(&self, f: M) -> Task<T, F>
    where
        F: Send + 'static,
        M: Fn(E) -> F + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.derive(move |settle: Settle<T, F>| {
            let f = Arc::clone(&f);
            let resolved = settle.clone();
            ForkHandlers::new()
                .on_rejected(move |e| settle.reject(f(e)))
                .on_resolved(move |v| resolved.resolve(v))
        })
    }

    /// Map both branches: `on_rejected` for rejections, `on_resolved` for values.
    pub fn bimap<F, U, MR, MS>(&self, on_rejected: MR, on_resolved: MS) -> Task<U, F>
    where
        F: Send + 'static,
        U: Send + 'static,
        MR: Fn(E) -> F + Send + Sync + 'static,
        MS: Fn(T) -> U + Send + Sync + 'static,
    {
        let (on_rejected, on_resolved) = (Arc::new(on_rejected), Arc::new(on_resolved));
        self.derive(move |settle: Settle<U, F>| {
            let (g, f) = (Arc::clone(&on_rejected), Arc::clone(&on_resolved));
            let rejected = settle.clone();
            ForkHandlers::new()
                .on_rejected(move |e| rejected.reject(g(e)))
                .on_resolved(move |v| settle.resolve(f(v)))
        })
    }

    /// Continue with the task returned by `f` for the resolved value.
    ///
    /// `f` runs at fork time, once upstream resolves. Rejections skip it.
    /// Cancelling the chained task cancels whichever fork is current.
    ///
    /// ```rust
    /// use ripple::task::Task;
    ///
    /// # tokio_test::block_on(async {
    /// let task = Task::<i32, String>::of(5).chain(|x| Task::of(2 * x));
    /// assert_eq!(task.to_future().await, Ok(10));
    /// # });
    /// ```
    pub fn chain<U, M>(&self, f: M) -> Task<U, E>
    where
        U: Send + 'static,
        M: Fn(T) -> Task<U, E> + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f = Arc::new(f);
        Task::new(move |settle: Settle<U, E>| {
            let current: Arc<Mutex<Option<Cancel>>> = Arc::new(Mutex::new(None));
            let (f, slot) = (Arc::clone(&f), Arc::clone(&current));
            let (rejected, cancelled) = (settle.clone(), settle.clone());

            let cancel = upstream.fork_with(
                ForkHandlers::new()
                    .on_rejected(move |e| rejected.reject(e))
                    .on_cancelled(move || cancelled.cancel())
                    .on_resolved(move |v| {
                        let (rejected, cancelled, watch) =
                            (settle.clone(), settle.clone(), settle.clone());
                        let inner = f(v).fork_with(
                            ForkHandlers::new()
                                .on_rejected(move |e| rejected.reject(e))
                                .on_cancelled(move || cancelled.cancel())
                                .on_resolved(move |u| settle.resolve(u)),
                        );
                        *slot.lock() = Some(inner.clone());
                        // Cancelled while upstream was resolving.
                        if watch.is_cancelled() {
                            inner.cancel();
                        }
                    }),
            );

            Cleanup::new(move || {
                cancel.cancel();
                let inner = current.lock().take();
                if let Some(inner) = inner {
                    inner.cancel();
                }
            })
        })
    }

    /// Merge both branches into a resolved value.
    ///
    /// ```rust
    /// use ripple::task::Task;
    ///
    /// # tokio_test::block_on(async {
    /// let task = Task::<i32, String>::rejected("boom".into())
    ///     .fold(|e| format!("error: {e}"), |v| format!("value: {v}"));
    /// assert_eq!(task.to_future().await, Ok("error: boom".to_string()));
    /// # });
    /// ```
    pub fn fold<U, MR, MS>(&self, on_rejected: MR, on_resolved: MS) -> Task<U, E>
    where
        U: Send + 'static,
        MR: Fn(E) -> U + Send + Sync + 'static,
        MS: Fn(T) -> U + Send + Sync + 'static,
    {
        let (on_rejected, on_resolved) = (Arc::new(on_rejected), Arc::new(on_resolved));
        self.derive(move |settle: Settle<U, E>| {
            let (g, f) = (Arc::clone(&on_rejected), Arc::clone(&on_resolved));
            let from_error = settle.clone();
            ForkHandlers::new()
                .on_rejected(move |e| from_error.resolve(g(e)))
                .on_resolved(move |v| settle.resolve(f(v)))
        })
    }

    /// Run upstream for its effects, but resolve with `value` when it resolves.
    ///
    /// Only the resolved branch is overridden; a rejection passes through.
    pub fn resolve_with<U>(&self, value: U) -> Task<U, E>
    where
        U: Clone + Send + Sync + 'static,
    {
        self.derive(move |settle: Settle<U, E>| {
            let value = value.clone();
            let rejected = settle.clone();
            ForkHandlers::new()
                .on_rejected(move |e| rejected.reject(e))
                .on_resolved(move |_| settle.resolve(value))
        })
    }

    /// Run upstream for its effects, but reject with `error` when it rejects.
    ///
    /// Only the rejected branch is overridden; a resolution passes through.
    pub fn reject_with<F>(&self, error: F) -> Task<T, F>
    where
        F: Clone + Send + Sync + 'static,
    {
        self.derive(move |settle: Settle<T, F>| {
            let error = error.clone();
            let resolved = settle.clone();
            ForkHandlers::new()
                .on_rejected(move |_| settle.reject(error))
                .on_resolved(move |v| resolved.resolve(v))
        })
    }

    /// Run upstream but never deliver its outcome.
    ///
    /// Neither the resolved nor the rejected handler of the result ever runs.
    /// Cancellation still works.
    pub fn empty(&self) -> Task<T, E> {
        self.derive(|_settle: Settle<T, E>| ForkHandlers::new())
    }
}
