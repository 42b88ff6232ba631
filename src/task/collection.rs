//! Running several tasks as one: `parallel`, `series` and `race`.
//!
//! Cancelling the combined task cancels every member still running, and a
//! member cancelling itself cancels the combined task.

use std::sync::Arc;

use parking_lot::Mutex;

use super::fork::{CancelGroup, Cleanup, ForkHandlers, Settle};
use super::Task;

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Fork every task at once and resolve with all values in input order.
    ///
    /// Rejects with the first rejection and cancels the remaining members.
    ///
    /// ```rust
    /// use ripple::task::Task;
    ///
    /// # tokio_test::block_on(async {
    /// let all = Task::parallel(vec![Task::<i32, String>::of(1), Task::of(2)]);
    /// assert_eq!(all.to_future().await, Ok(vec![1, 2]));
    /// # });
    /// ```
    pub fn parallel(tasks: Vec<Task<T, E>>) -> Task<Vec<T>, E> {
        let tasks = Arc::new(tasks);
        Task::new(move |settle: Settle<Vec<T>, E>| {
            let total = tasks.len();
            if total == 0 {
                settle.resolve(Vec::new());
                return Cleanup::none();
            }

            let slots: Arc<Mutex<(Vec<Option<T>>, usize)>> =
                Arc::new(Mutex::new(((0..total).map(|_| None).collect(), total)));
            let group = CancelGroup::default();

            for (index, task) in tasks.iter().enumerate() {
                let (rejected, cancelled, resolved) =
                    (settle.clone(), settle.clone(), settle.clone());
                let (siblings, slots) = (group.clone(), Arc::clone(&slots));
                let cancel = task.fork_with(
                    ForkHandlers::new()
                        .on_rejected(move |e| {
                            rejected.reject(e);
                            siblings.cancel_all();
                        })
                        .on_cancelled(move || cancelled.cancel())
                        .on_resolved(move |v| {
                            let finished = {
                                let mut guard = slots.lock();
                                guard.0[index] = Some(v);
                                guard.1 -= 1;
                                if guard.1 == 0 {
                                    Some(std::mem::take(&mut guard.0))
                                } else {
                                    None
                                }
                            };
                            if let Some(values) = finished {
                                resolved.resolve(values.into_iter().flatten().collect());
                            }
                        }),
                );
                group.push(cancel);
            }

            if !settle.is_pending() {
                group.cancel_all();
            }
            Cleanup::new(move || group.cancel_all())
        })
    }

    /// Fork the tasks one after another, resolving with all values in order.
    ///
    /// Stops at the first rejection.
    pub fn series(tasks: Vec<Task<T, E>>) -> Task<Vec<T>, E> {
        let tasks = Arc::new(tasks);
        Task::new(move |settle: Settle<Vec<T>, E>| {
            let group = CancelGroup::default();
            run_series(Arc::new(Series {
                tasks: Arc::clone(&tasks),
                values: Mutex::new(Vec::with_capacity(tasks.len())),
                settle,
                group: group.clone(),
            }));
            Cleanup::new(move || group.cancel_all())
        })
    }

    /// Fork every task and settle with whichever settles first.
    ///
    /// The losers are cancelled. An empty race never settles.
    pub fn race(tasks: Vec<Task<T, E>>) -> Task<T, E> {
        let tasks = Arc::new(tasks);
        Task::new(move |settle: Settle<T, E>| {
            let group = CancelGroup::default();
            for task in tasks.iter() {
                let (rejected, cancelled, resolved) =
                    (settle.clone(), settle.clone(), settle.clone());
                let (losers_a, losers_b) = (group.clone(), group.clone());
                let cancel = task.fork_with(
                    ForkHandlers::new()
                        .on_rejected(move |e| {
                            rejected.reject(e);
                            losers_a.cancel_all();
                        })
                        .on_cancelled(move || cancelled.cancel())
                        .on_resolved(move |v| {
                            resolved.resolve(v);
                            losers_b.cancel_all();
                        }),
                );
                group.push(cancel);
                if !settle.is_pending() {
                    break;
                }
            }

            if !settle.is_pending() {
                group.cancel_all();
            }
            Cleanup::new(move || group.cancel_all())
        })
    }
}

/// One `series` fork: the members, the values collected so far and the
/// combined task's settlement.
struct Series<T, E> {
    tasks: Arc<Vec<Task<T, E>>>,
    values: Mutex<Vec<T>>,
    settle: Settle<Vec<T>, E>,
    group: CancelGroup,
}

/// Where one member's fork stands relative to the loop that started it.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Turn {
    Forking,
    Resolved,
    Waiting,
}

/// Fork members one after another.
///
/// Members that resolve while being forked are continued by this loop; a
/// member resolving later restarts it from its handler, so the stack stays
/// flat however many members settle synchronously.
fn run_series<T, E>(series: Arc<Series<T, E>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    loop {
        if !series.settle.is_pending() {
            return;
        }
        let index = series.values.lock().len();
        let Some(task) = series.tasks.get(index).cloned() else {
            let values = std::mem::take(&mut *series.values.lock());
            series.settle.resolve(values);
            return;
        };

        let turn = Arc::new(Mutex::new(Turn::Forking));
        let (rejected, cancelled) = (series.settle.clone(), series.settle.clone());
        let (resolved, next) = (Arc::clone(&turn), Arc::clone(&series));
        let cancel = task.fork_with(
            ForkHandlers::new()
                .on_rejected(move |e| rejected.reject(e))
                .on_cancelled(move || cancelled.cancel())
                .on_resolved(move |v| {
                    next.values.lock().push(v);
                    let previous = std::mem::replace(&mut *resolved.lock(), Turn::Resolved);
                    if previous == Turn::Waiting {
                        run_series(next);
                    }
                }),
        );
        series.group.push(cancel);

        let mut current = turn.lock();
        if *current != Turn::Resolved {
            *current = Turn::Waiting;
            return;
        }
    }
}
