//! Tests for the Task type.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::*;

fn delay(ms: u64) -> Task<(), String> {
    Task::new(move |settle| {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            settle.resolve(());
        });
        Cleanup::new(move || timer.abort())
    })
}

#[derive(Default)]
struct Seen {
    resolved: AtomicUsize,
    rejected: AtomicUsize,
    cancelled: AtomicUsize,
}

fn counting<T: Send + 'static, E: Send + 'static>(seen: &Arc<Seen>) -> ForkHandlers<T, E> {
    let (a, b, c) = (seen.clone(), seen.clone(), seen.clone());
    ForkHandlers::new()
        .on_resolved(move |_| {
            a.resolved.fetch_add(1, Ordering::SeqCst);
        })
        .on_rejected(move |_| {
            b.rejected.fetch_add(1, Ordering::SeqCst);
        })
        .on_cancelled(move || {
            c.cancelled.fetch_add(1, Ordering::SeqCst);
        })
}

// Constructors
#[tokio::test]
async fn test_of_resolves() {
    assert_eq!(Task::<_, String>::of(5).outcome().await, Outcome::Resolved(5));
}

#[tokio::test]
async fn test_rejected_rejects() {
    assert_eq!(
        Task::<i32, _>::rejected(5).outcome().await,
        Outcome::Rejected(5)
    );
}

#[tokio::test]
async fn test_from_future_resolves_with_captured_argument() {
    let n = 5;
    let task = Task::from_future(move || async move { Ok::<_, String>(5 + n) });
    assert_eq!(task.to_future().await, Ok(10));
}

#[tokio::test]
async fn test_from_future_rejects() {
    let task = Task::<i32, _>::from_future(|| async { Err(5) });
    assert_eq!(task.outcome().await, Outcome::Rejected(5));
}

// resolve_with / reject_with
#[tokio::test]
async fn test_resolve_with_overrides_value() {
    let task = Task::<_, String>::of(5).map(|x| x * 2).resolve_with(9);
    assert_eq!(task.to_future().await, Ok(9));
}

#[tokio::test]
async fn test_reject_with_overrides_error() {
    let task = Task::<i32, _>::rejected(5)
        .map(|x| x * 2)
        .map_rejected(|x| x * 5)
        .reject_with(4);
    assert_eq!(task.to_future().await, Err(4));
}

#[tokio::test]
async fn test_resolve_with_leaves_rejection_untouched() {
    let task = Task::<i32, _>::rejected("bad").resolve_with(9);
    assert_eq!(task.outcome().await, Outcome::Rejected("bad"));
}

#[tokio::test]
async fn test_reject_with_leaves_resolution_untouched() {
    let task = Task::<_, String>::of(5).reject_with(4);
    assert_eq!(task.outcome().await, Outcome::Resolved(5));
}

// fork
#[tokio::test]
async fn test_fork_calls_resolved_handler() {
    let got = Arc::new(Mutex::new(None));
    let slot = got.clone();
    Task::<_, String>::of(5).fork(|_| panic!("not rejected"), move |v| {
        *slot.lock().unwrap() = Some(v)
    });
    assert_eq!(*got.lock().unwrap(), Some(5));
}

#[tokio::test]
async fn test_fork_calls_rejected_handler() {
    let got = Arc::new(Mutex::new(None));
    let slot = got.clone();
    Task::<i32, _>::rejected(5).fork(move |e| *slot.lock().unwrap() = Some(e), |_| {
        panic!("not resolved")
    });
    assert_eq!(*got.lock().unwrap(), Some(5));
}

#[tokio::test]
async fn test_task_can_be_forked_twice() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let task = Task::<usize, String>::new(move |settle| {
        settle.resolve(counter.fetch_add(1, Ordering::SeqCst));
        Cleanup::none()
    });
    assert_eq!(task.to_future().await, Ok(0));
    assert_eq!(task.to_future().await, Ok(1));
}

#[tokio::test]
async fn test_settle_only_once() {
    let task = Task::<i32, i32>::new(|settle| {
        settle.resolve(1);
        settle.reject(2);
        settle.resolve(3);
        Cleanup::none()
    });
    let seen = Arc::new(Seen::default());
    task.fork_with(counting(&seen));
    assert_eq!(seen.resolved.load(Ordering::SeqCst), 1);
    assert_eq!(seen.rejected.load(Ordering::SeqCst), 0);
}

// fold
#[derive(Debug, PartialEq)]
enum Folded {
    Error(String),
    Value(i32),
}

#[tokio::test]
async fn test_fold_resolved() {
    let task = Task::<_, String>::of(5).fold(Folded::Error, Folded::Value);
    assert_eq!(task.outcome().await, Outcome::Resolved(Folded::Value(5)));
}

#[tokio::test]
async fn test_fold_rejected_still_resolves() {
    let task = Task::<i32, _>::rejected("Www".to_string()).fold(Folded::Error, Folded::Value);
    assert_eq!(
        task.outcome().await,
        Outcome::Resolved(Folded::Error("Www".to_string()))
    );
}

// map / map_rejected / bimap
#[tokio::test]
async fn test_map_resolved() {
    let task = Task::<_, String>::of(5).map(|x| x * 2);
    assert_eq!(task.to_future().await, Ok(10));
}

#[tokio::test]
async fn test_map_ignored_for_rejected() {
    let task = Task::<i32, _>::rejected(5).map(|x| x * 2);
    assert_eq!(task.to_future().await, Err(5));
}

#[tokio::test]
async fn test_map_rejected() {
    let task = Task::<i32, _>::rejected(5).map_rejected(|x| x * 2);
    assert_eq!(task.to_future().await, Err(10));
}

#[tokio::test]
async fn test_map_rejected_ignored_for_resolved() {
    let task = Task::<_, i32>::of(5).map_rejected(|x| x * 2);
    assert_eq!(task.to_future().await, Ok(5));
}

#[tokio::test]
async fn test_bimap_both_branches() {
    let mapper = |t: Task<i32, i32>| t.bimap(|x| x * 2, |y| y * 3);
    assert_eq!(mapper(Task::of(5)).to_future().await, Ok(15));
    assert_eq!(mapper(Task::rejected(5)).to_future().await, Err(10));
}

// chain
#[tokio::test]
async fn test_chain_merges_nested_task() {
    let task = Task::<_, String>::of(5).chain(|x| Task::of(2 * x));
    assert_eq!(task.to_future().await, Ok(10));
}

#[tokio::test]
async fn test_chain_ignored_for_rejected() {
    let task = Task::<i32, _>::rejected(5).chain(|x| Task::of(2 * x));
    assert_eq!(task.to_future().await, Err(5));
}

#[tokio::test]
async fn test_chain_callback_runs_at_fork_time() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let task = Task::<_, String>::of(1).chain(move |x| {
        counter.fetch_add(1, Ordering::SeqCst);
        Task::of(x)
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let _ = task.to_future().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// empty
#[tokio::test]
async fn test_empty_never_settles() {
    let task = Task::<_, String>::of(5)
        .map(|x| x + 1)
        .chain(|x| Task::of(2 * x))
        .empty()
        .map(|x| x + 5);

    let seen = Arc::new(Seen::default());
    task.fork_with(counting(&seen));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(seen.resolved.load(Ordering::SeqCst), 0);
    assert_eq!(seen.rejected.load(Ordering::SeqCst), 0);
}

// to_future
#[tokio::test]
async fn test_to_future_resolved_pipeline() {
    let task = Task::<_, i32>::of(5)
        .map(|x| x + 1)
        .chain(|x| Task::of(2 * x))
        .map(|x| x + 5);
    assert_eq!(task.to_future().await, Ok(17));
}

#[tokio::test]
async fn test_to_future_rejected_pipeline() {
    let task = Task::<i32, _>::rejected(5)
        .map(|x| x + 1)
        .chain(|x| Task::of(2 * x))
        .map(|x| x + 5);
    assert_eq!(task.to_future().await, Err(5));
}

#[tokio::test]
async fn test_to_future_pending_after_self_cancel() {
    let task = Task::<i32, String>::new(|settle| {
        settle.cancel();
        Cleanup::none()
    });
    let result = tokio::time::timeout(Duration::from_millis(20), task.to_future()).await;
    assert!(result.is_err());
}

// Timers
#[tokio::test]
async fn test_delay_map_chain_fork() {
    let start = Instant::now();
    let task = delay(40)
        .map(|_| 40_u64)
        .map(|n| n + 10)
        .chain(|ms| delay(ms))
        .map(|_| 10);
    assert_eq!(task.to_future().await, Ok(10));
    assert!(start.elapsed() >= Duration::from_millis(90));
}

#[tokio::test]
async fn test_cancel_without_cancel_handler() {
    let seen = Arc::new(Seen::default());
    let (a, b) = (seen.clone(), seen.clone());
    let cancel = delay(30).fork(
        move |_| {
            a.rejected.fetch_add(1, Ordering::SeqCst);
        },
        move |_| {
            b.resolved.fetch_add(1, Ordering::SeqCst);
        },
    );
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(seen.resolved.load(Ordering::SeqCst), 0);
    assert_eq!(seen.rejected.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_fires_cancelled_handler_once() {
    let seen = Arc::new(Seen::default());
    let cancel = delay(30).fork_with(counting(&seen));
    cancel.cancel();
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(seen.cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(seen.resolved.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cleanup_runs_once_on_cancel_and_never_after_settle() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let make = |counter: Arc<AtomicUsize>, settle_now: bool| {
        Task::<(), String>::new(move |settle| {
            if settle_now {
                settle.resolve(());
            }
            let counter = counter.clone();
            Cleanup::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    };

    let cancel = make(cleanups.clone(), false).fork(|_| {}, |_| {});
    cancel.cancel();
    cancel.cancel();
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);

    let cancel = make(cleanups.clone(), true).fork(|_| {}, |_| {});
    cancel.cancel();
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_from_within_task() {
    let task = Task::<i32, String>::new(|settle| {
        settle.cancel();
        Cleanup::none()
    });
    assert_eq!(task.outcome().await, Outcome::Cancelled);
}

#[tokio::test]
async fn test_self_cancel_runs_late_cleanup() {
    let cleaned = Arc::new(AtomicUsize::new(0));
    let counter = cleaned.clone();
    let task = Task::<i32, String>::new(move |settle| {
        settle.cancel();
        settle.resolve(1);
        let counter = counter.clone();
        Cleanup::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    });
    assert_eq!(task.outcome().await, Outcome::Cancelled);
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_propagates_through_chain() {
    let seen = Arc::new(Seen::default());
    let task = delay(10).chain(|_| delay(200)).map(|_| 1);
    let cancel = task.fork_with(counting(&seen));
    tokio::time::sleep(Duration::from_millis(40)).await;
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(seen.cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(seen.resolved.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dropping_outcome_future_cancels_fork() {
    let cleaned = Arc::new(AtomicUsize::new(0));
    let counter = cleaned.clone();
    let task = Task::<(), String>::new(move |_settle| {
        let counter = counter.clone();
        Cleanup::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    });
    let _ = tokio::time::timeout(Duration::from_millis(10), task.outcome()).await;
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);
}

// parallel / series / race
#[tokio::test]
async fn test_parallel_keeps_input_order() {
    let slow = delay(30).resolve_with(1);
    let fast = delay(5).resolve_with(2);
    let all = Task::parallel(vec![slow, fast]);
    assert_eq!(all.to_future().await, Ok(vec![1, 2]));
}

#[tokio::test]
async fn test_parallel_empty_resolves() {
    let all = Task::<i32, String>::parallel(Vec::new());
    assert_eq!(all.to_future().await, Ok(Vec::new()));
}

#[tokio::test]
async fn test_parallel_rejects_with_first_error() {
    let all = Task::parallel(vec![
        delay(50).resolve_with(1),
        Task::rejected("boom".to_string()),
    ]);
    assert_eq!(all.to_future().await, Err("boom".to_string()));
}

#[tokio::test]
async fn test_series_runs_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let step = |n: i32, log: Arc<Mutex<Vec<i32>>>| {
        delay(5).map(move |_| {
            log.lock().unwrap().push(n);
            n
        })
    };
    let all = Task::series(vec![step(1, log.clone()), step(2, log.clone()), step(3, log.clone())]);
    assert_eq!(all.to_future().await, Ok(vec![1, 2, 3]));
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_series_stops_at_rejection() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let after = Task::<i32, String>::new(move |settle| {
        counter.fetch_add(1, Ordering::SeqCst);
        settle.resolve(3);
        Cleanup::none()
    });
    let all = Task::series(vec![Task::of(1), Task::rejected("stop".to_string()), after]);
    assert_eq!(all.to_future().await, Err("stop".to_string()));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_series_of_many_ready_tasks() {
    let all = Task::<usize, String>::series((0..20_000).map(Task::of).collect());
    let values = all.to_future().await.unwrap();
    assert_eq!(values.len(), 20_000);
    assert_eq!(values[19_999], 19_999);
}

#[tokio::test]
async fn test_series_mixes_ready_and_delayed_members() {
    let members: Vec<Task<usize, String>> = (0..2_000)
        .map(|n| {
            if n % 500 == 0 {
                delay(1).map(move |_| n)
            } else {
                Task::of(n)
            }
        })
        .collect();
    let values = Task::series(members).to_future().await.unwrap();
    assert_eq!(values, (0..2_000).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_race_takes_first_and_cancels_losers() {
    let seen = Arc::new(Seen::default());
    let observed = seen.clone();
    let slow = Task::<i32, String>::new(move |settle| {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            settle.resolve(1);
        });
        let seen = observed.clone();
        Cleanup::new(move || {
            seen.cancelled.fetch_add(1, Ordering::SeqCst);
            timer.abort();
        })
    });
    let fast = delay(5).resolve_with(2);
    assert_eq!(Task::race(vec![slow, fast]).to_future().await, Ok(2));
    assert_eq!(seen.cancelled.load(Ordering::SeqCst), 1);
}
