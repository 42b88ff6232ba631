//! The effect dispatch engine.
//!
//! A [`Runner`] interprets [`Program`]s: every [`Operation`](crate::effect::Operation)
//! a program performs is looked up by name in the runner's [`Handlers`]
//! (falling back to the default operation registry) and the implementation
//! receives a [`Continuation`] to resume, end, fail or nest the program.
//!
//! # Example
//!
//! ```rust
//! use ripple::effect::{EffectDef, Signature};
//! use ripple::runner::{Co, Handlers};
//! use ripple::task::Outcome;
//! use ripple::{payload, Value};
//!
//! # tokio_test::block_on(async {
//! let counter = EffectDef::define("Counter", [("next", Signature::arity(0))]).unwrap();
//! let runner = counter
//!     .handler(Handlers::new().on("next", |k, _| k.resume(Value::new(1_i32))))
//!     .unwrap();
//!
//! let def = counter.clone();
//! let program = move |co: Co, _args: Vec<Value>| {
//!     let def = def.clone();
//!     async move {
//!         let a = co.perform(def.operation("next", payload![])?).await.downcast::<i32>()?;
//!         let b = co.perform(def.operation("next", payload![])?).await.downcast::<i32>()?;
//!         Ok::<_, Value>(Value::new(a + b))
//!     }
//! };
//!
//! match runner.run(program, payload![]).await {
//!     Outcome::Resolved(v) => assert_eq!(v.downcast::<i32>().unwrap(), 2),
//!     other => panic!("unexpected {:?}", other),
//! }
//! # });
//! ```
//!
//! Errors from [`EffectDef::operation`](crate::effect::EffectDef::operation)
//! convert into `Value` so they can be propagated with `?` inside programs.
//!
//! # Cancellation
//!
//! Each call to [`Runner::run`] gets its own cancellation scope, reachable
//! through [`Invocation::cancel_handle`]. [`Runner::cancel`] cancels every
//! invocation currently running on the runner. A cancelled invocation
//! completes with [`Outcome::Cancelled`] and drops the program.

mod cancel;
mod co;
mod config;
mod continuation;
mod drive;
mod error;
mod handlers;
mod value_policy;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use parking_lot::Mutex;

pub use cancel::CancelHandle;
pub use co::{program, BoxFuture, Co, Program, ProgramRef};
pub use config::{RunnerConfig, DEFAULT_MAX_CALL_DEPTH};
pub use continuation::Continuation;
pub use error::EngineError;
pub use handlers::{Handlers, OperationFn, Step, ValueFn};

use cancel::CancelSignal;

use crate::effect::EffectError;
use crate::operations;
use crate::task::{Cleanup, Outcome, Task};
use crate::value::Value;

struct RunnerInner {
    handlers: Handlers,
    config: RunnerConfig,
    active: Mutex<Vec<Weak<CancelSignal>>>,
}

/// An interpreter bound to a handler table.
///
/// Cheap to clone; clones share the handler table and the set of running
/// invocations. A runner is reusable: `run` may be called any number of
/// times, concurrently.
#[derive(Clone)]
pub struct Runner {
    inner: Arc<RunnerInner>,
}

impl Runner {
    /// A runner with the default configuration.
    pub fn new(handlers: Handlers) -> Self {
        Self::with_config(handlers, RunnerConfig::default())
    }

    /// A runner with an explicit configuration.
    pub fn with_config(handlers: Handlers, config: RunnerConfig) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                handlers,
                config,
                active: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The handler table.
    pub fn handlers(&self) -> &Handlers {
        &self.inner.handlers
    }

    /// The configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.inner.config
    }

    /// Interpret `program` with `args`.
    ///
    /// Nothing runs until the returned [`Invocation`] is polled.
    pub fn run<P: Program>(&self, program: P, args: Vec<Value>) -> Invocation {
        self.run_ref(Arc::new(program), args)
    }

    /// [`run`](Self::run) for an already shared program.
    pub fn run_ref(&self, program: ProgramRef, args: Vec<Value>) -> Invocation {
        let signal = Arc::new(CancelSignal::new());
        {
            let mut active = self.inner.active.lock();
            active.retain(|signal| signal.strong_count() > 0);
            active.push(Arc::downgrade(&signal));
        }
        Invocation {
            cancel: CancelHandle::new(Arc::clone(&signal)),
            future: drive::drive(self.clone(), program, args, signal, 0),
        }
    }

    /// A [`Task`] that runs `program` each time it is forked.
    ///
    /// `args` builds the arguments for every fork. Cancelling the fork
    /// cancels that invocation. Forking requires a tokio runtime.
    pub fn task<P, A>(&self, program: P, args: A) -> Task<Value, Value>
    where
        P: Program,
        A: Fn() -> Vec<Value> + Send + Sync + 'static,
    {
        let runner = self.clone();
        let program: ProgramRef = Arc::new(program);
        Task::new(move |settle| {
            let invocation = runner.run_ref(Arc::clone(&program), args());
            let handle = invocation.cancel_handle();
            let join = tokio::spawn(async move {
                match invocation.await {
                    Outcome::Resolved(value) => settle.resolve(value),
                    Outcome::Rejected(error) => settle.reject(error),
                    Outcome::Cancelled => settle.cancel(),
                }
            });
            Cleanup::new(move || {
                handle.cancel();
                join.abort();
            })
        })
    }

    /// Cancel every invocation of this runner that is still running.
    ///
    /// Invocations started afterwards are unaffected.
    pub fn cancel(&self) {
        let active = std::mem::take(&mut *self.inner.active.lock());
        #[cfg(feature = "tracing")]
        tracing::debug!(invocations = active.len(), "cancelling runner");
        for signal in active.iter().filter_map(Weak::upgrade) {
            signal.cancel();
        }
    }

    /// A new runner whose table is the union of both; `other` wins on
    /// collisions. The configuration is taken from `self`.
    pub fn concat(&self, other: &Runner) -> Runner {
        Runner::with_config(
            self.inner.handlers.clone().merge(&other.inner.handlers),
            self.inner.config.clone(),
        )
    }

    /// Find the implementation of `operation`.
    pub(crate) fn lookup(&self, operation: &str) -> Option<OperationFn> {
        if let Some(implementation) = self.inner.handlers.get(operation) {
            return Some(Arc::clone(implementation));
        }
        if self.inner.config.default_operations() {
            return operations::lookup(operation);
        }
        None
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(Handlers::new())
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("handlers", &self.inner.handlers)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Merge runners left to right; later entries win on collisions.
///
/// An empty slice yields a runner with no handlers. The configuration comes
/// from the first runner.
pub fn compose_handlers(runners: &[&Runner]) -> Runner {
    match runners.split_first() {
        Some((first, rest)) => rest
            .iter()
            .fold((*first).clone(), |acc, runner| acc.concat(runner)),
        None => Runner::default(),
    }
}

/// Interpret `program` on a fresh runner built from `handlers`.
pub fn run<P: Program>(handlers: Handlers, program: P, args: Vec<Value>) -> Invocation {
    Runner::new(handlers).run(program, args)
}

/// One running (or not yet polled) interpretation of a program.
///
/// Resolves to the three-way outcome of the program.
#[must_use = "an invocation does nothing unless awaited"]
pub struct Invocation {
    future: BoxFuture<'static, Outcome<Value, Value>>,
    cancel: CancelHandle,
}

impl Invocation {
    /// A handle cancelling only this invocation.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel this invocation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Future for Invocation {
    type Output = Outcome<Value, Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl From<EffectError> for Value {
    fn from(error: EffectError) -> Self {
        Value::new(error)
    }
}

impl From<EngineError> for Value {
    fn from(error: EngineError) -> Self {
        Value::new(error)
    }
}
