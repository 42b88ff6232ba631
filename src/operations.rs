//! Default operations, available to every runner unless disabled.
//!
//! When a performed operation has no entry in the runner's own table, the
//! runner looks here by name. Turn the fallback off with
//! [`RunnerConfig::with_default_operations`](crate::runner::RunnerConfig).
//! The constructors build operations under the effect name [`EFFECT`].
//!
//! | Operation | Payload | Resumes with |
//! |---|---|---|
//! | `sleep` | `Duration` | `()` after the delay |
//! | `call` | `ProgramRef`, `Vec<Value>` | the nested program's value |
//! | `await_task` | `Task<Value, Value>` | the task's value |
//! | `series` | `Vec<ProgramRef>` | `Vec<Value>`, programs run one by one |
//! | `parallel` | `Vec<ProgramRef>` | `Vec<Value>`, programs run concurrently |
//! | `race` | `Vec<ProgramRef>` | the first program to settle |
//!
//! Rejections of nested programs and tasks are rethrown into the caller.
//!
//! ```rust
//! use ripple::operations;
//! use ripple::runner::{Co, Runner};
//! use ripple::{payload, Value};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let program = |co: Co, _args: Vec<Value>| async move {
//!     co.perform(operations::sleep(Duration::from_millis(1))).await;
//!     Ok::<_, Value>(Value::new("awake"))
//! };
//! let outcome = Runner::default().run(program, payload![]).await;
//! assert!(outcome.is_resolved());
//! # });
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;

use crate::effect::Operation;
use crate::runner::{Continuation, EngineError, OperationFn, ProgramRef};
use crate::task::{Outcome, Task};
use crate::value::Value;

/// Effect name carried by the default operations.
pub const EFFECT: &str = "Generic";

static REGISTRY: LazyLock<HashMap<&'static str, OperationFn>> = LazyLock::new(|| {
    let mut registry: HashMap<&'static str, OperationFn> = HashMap::new();
    registry.insert("sleep", Arc::new(run_sleep));
    registry.insert("call", Arc::new(run_call));
    registry.insert("await_task", Arc::new(run_await_task));
    registry.insert("series", Arc::new(run_series));
    registry.insert("parallel", Arc::new(run_parallel));
    registry.insert("race", Arc::new(run_race));
    registry
});

/// Returns true if `operation` names a default operation.
pub fn is_default(operation: &str) -> bool {
    REGISTRY.contains_key(operation)
}

/// Names of all default operations, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}

pub(crate) fn lookup(operation: &str) -> Option<OperationFn> {
    REGISTRY.get(operation).cloned()
}

/// Resume after `duration`.
pub fn sleep(duration: Duration) -> Operation {
    Operation::new(EFFECT, "sleep", vec![Value::new(duration)])
}

/// Run `program` with `args` as a nested call.
pub fn call(program: ProgramRef, args: Vec<Value>) -> Operation {
    Operation::new(EFFECT, "call", vec![Value::new(program), Value::new(args)])
}

/// Wait for `task`.
pub fn await_task(task: Task<Value, Value>) -> Operation {
    Operation::new(EFFECT, "await_task", vec![Value::new(task)])
}

/// Run `programs` one after another.
pub fn series(programs: Vec<ProgramRef>) -> Operation {
    Operation::new(EFFECT, "series", vec![Value::new(programs)])
}

/// Run `programs` concurrently.
pub fn parallel(programs: Vec<ProgramRef>) -> Operation {
    Operation::new(EFFECT, "parallel", vec![Value::new(programs)])
}

/// Run `programs` concurrently and keep the first to settle.
pub fn race(programs: Vec<ProgramRef>) -> Operation {
    Operation::new(EFFECT, "race", vec![Value::new(programs)])
}

fn invalid(operation: &str, expected: &str) -> Value {
    Value::new(EngineError::InvalidPayload {
        operation: operation.to_string(),
        expected: expected.to_string(),
    })
}

fn single<T: Any>(operation: &str, expected: &str, payload: Vec<Value>) -> Result<T, Value> {
    let mut args = payload.into_iter();
    match (args.next(), args.next()) {
        (Some(value), None) => value
            .downcast::<T>()
            .map_err(|_| invalid(operation, expected)),
        _ => Err(invalid(operation, expected)),
    }
}

fn run_sleep(k: Continuation, payload: Vec<Value>) {
    match single::<Duration>("sleep", "a Duration", payload) {
        Ok(duration) => {
            let resume = k.clone();
            k.spawn(async move {
                tokio::time::sleep(duration).await;
                resume.resume(Value::unit());
            });
        }
        Err(error) => k.throw_error(error),
    }
}

fn run_call(k: Continuation, payload: Vec<Value>) {
    const EXPECTED: &str = "a ProgramRef and a Vec<Value>";
    let mut args = payload.into_iter();
    let parsed = match (args.next(), args.next(), args.next()) {
        (Some(program), Some(call_args), None) => program
            .downcast::<ProgramRef>()
            .ok()
            .zip(call_args.downcast::<Vec<Value>>().ok()),
        _ => None,
    };
    match parsed {
        Some((program, call_args)) => k.call_ref(program, call_args),
        None => k.throw_error(invalid("call", EXPECTED)),
    }
}

fn run_await_task(k: Continuation, payload: Vec<Value>) {
    match single::<Task<Value, Value>>("await_task", "a Task<Value, Value>", payload) {
        Ok(task) => k.adopt(task),
        Err(error) => k.throw_error(error),
    }
}

fn run_series(k: Continuation, payload: Vec<Value>) {
    let programs = match single::<Vec<ProgramRef>>("series", "a Vec<ProgramRef>", payload) {
        Ok(programs) => programs,
        Err(error) => return k.throw_error(error),
    };
    let driver = k.clone();
    k.spawn(async move {
        let mut values = Vec::with_capacity(programs.len());
        for program in programs {
            match driver.nested(program, Vec::new()).await {
                Outcome::Resolved(value) => values.push(value),
                Outcome::Rejected(error) => return driver.throw_error(error),
                Outcome::Cancelled => return,
            }
        }
        driver.resume(Value::new(values));
    });
}

fn run_parallel(k: Continuation, payload: Vec<Value>) {
    let programs = match single::<Vec<ProgramRef>>("parallel", "a Vec<ProgramRef>", payload) {
        Ok(programs) => programs,
        Err(error) => return k.throw_error(error),
    };
    let total = programs.len();
    let mut running: FuturesUnordered<_> = programs
        .into_iter()
        .enumerate()
        .map(|(index, program)| {
            let nested = k.nested(program, Vec::new());
            async move { (index, nested.await) }
        })
        .collect();
    let driver = k.clone();
    k.spawn(async move {
        let mut slots: Vec<Option<Value>> = (0..total).map(|_| None).collect();
        while let Some((index, outcome)) = running.next().await {
            match outcome {
                Outcome::Resolved(value) => slots[index] = Some(value),
                Outcome::Rejected(error) => return driver.throw_error(error),
                Outcome::Cancelled => return,
            }
        }
        let values: Vec<Value> = slots.into_iter().flatten().collect();
        driver.resume(Value::new(values));
    });
}

fn run_race(k: Continuation, payload: Vec<Value>) {
    let programs = match single::<Vec<ProgramRef>>("race", "a Vec<ProgramRef>", payload) {
        Ok(programs) if !programs.is_empty() => programs,
        Ok(_) => return k.throw_error(invalid("race", "at least one program")),
        Err(error) => return k.throw_error(error),
    };
    let contenders: Vec<_> = programs
        .into_iter()
        .map(|program| k.nested(program, Vec::new()))
        .collect();
    let driver = k.clone();
    k.spawn(async move {
        let (outcome, _, losers) = futures::future::select_all(contenders).await;
        drop(losers);
        match outcome {
            Outcome::Resolved(value) => driver.resume(value),
            Outcome::Rejected(error) => driver.throw_error(error),
            Outcome::Cancelled => {}
        }
    });
}
