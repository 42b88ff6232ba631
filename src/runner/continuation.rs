//! Continuations: what an operation implementation uses to drive the program.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;

use super::cancel::CancelHandle;
use super::co::{BoxFuture, Program, ProgramRef};
use super::drive::{drive, Frame};
use super::error::EngineError;
use super::Runner;
use crate::task::{Outcome, Task};
use crate::value::Value;

/// The continuation handed to an operation implementation.
///
/// Exactly one of [`resume`](Self::resume), [`end`](Self::end) or
/// [`throw_error`](Self::throw_error) is expected per operation; a
/// continuation may be cloned and moved into timers or spawned work, and only
/// the first resume takes effect. Once the invocation is cancelled, all three
/// are no-ops.
///
/// # Example
///
/// ```rust
/// use ripple::runner::Handlers;
/// use ripple::Value;
///
/// let handlers = Handlers::new().on("half", |k, args| {
///     match args.into_iter().next().map(|v| v.downcast::<i32>()) {
///         Some(Ok(n)) if n % 2 == 0 => k.resume(Value::new(n / 2)),
///         _ => k.throw_error(Value::new("odd or missing".to_string())),
///     }
/// });
/// # let _ = handlers;
/// ```
#[derive(Clone)]
pub struct Continuation {
    frame: Arc<Frame>,
    resume: Arc<Mutex<Option<oneshot::Sender<Value>>>>,
    finished: bool,
}

impl Continuation {
    pub(crate) fn new(frame: Arc<Frame>, resume: Option<oneshot::Sender<Value>>) -> Self {
        Self {
            frame,
            resume: Arc::new(Mutex::new(resume)),
            finished: false,
        }
    }

    /// Continuation for a program that has already returned: there is
    /// nothing left to resume, so `resume` ends the invocation.
    pub(crate) fn finished(frame: Arc<Frame>) -> Self {
        Self {
            frame,
            resume: Arc::new(Mutex::new(None)),
            finished: true,
        }
    }

    pub(crate) fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Continue the program, making `value` the result of its suspension.
    ///
    /// For a program that already returned (a value policy handling
    /// [`Step::Returned`](super::Step::Returned)) this behaves like
    /// [`end`](Self::end).
    pub fn resume(&self, value: Value) {
        if self.is_cancelled() {
            return;
        }
        if self.finished {
            self.frame.settle(Ok(value));
            return;
        }
        let sender = self.resume.lock().take();
        if let Some(sender) = sender {
            let _ = sender.send(value);
        }
    }

    /// Stop the program and resolve the invocation with `value`.
    pub fn end(&self, value: Value) {
        if !self.is_cancelled() {
            self.frame.settle(Ok(value));
        }
    }

    /// Stop the program and reject the invocation with `error`.
    pub fn throw_error(&self, error: Value) {
        if !self.is_cancelled() {
            self.frame.settle(Err(error));
        }
    }

    /// Run `program` on the same runner as a nested sub-call, then resume
    /// with its result or throw its error.
    ///
    /// The nested program shares this invocation's cancellation.
    pub fn call<P: Program>(&self, program: P, args: Vec<Value>) {
        self.call_ref(Arc::new(program), args);
    }

    /// [`call`](Self::call) for an already shared program.
    pub fn call_ref(&self, program: ProgramRef, args: Vec<Value>) {
        let nested = self.nested(program, args);
        let k = self.clone();
        self.spawn(async move {
            match nested.await {
                Outcome::Resolved(value) => k.resume(value),
                Outcome::Rejected(error) => k.throw_error(error),
                Outcome::Cancelled => {}
            }
        });
    }

    /// Start a nested execution of `program` and return its outcome as a
    /// future, without resuming anything.
    ///
    /// Building blocks like `parallel` and `race` combine these. Nesting past
    /// the configured depth yields a rejected outcome carrying
    /// [`EngineError::CallDepthExceeded`].
    pub fn nested(
        &self,
        program: ProgramRef,
        args: Vec<Value>,
    ) -> BoxFuture<'static, Outcome<Value, Value>> {
        let depth = self.frame.depth + 1;
        if let Some(limit) = self.frame.runner.config().max_call_depth() {
            if depth > limit {
                #[cfg(feature = "tracing")]
                tracing::warn!(limit, "nested call depth exceeded");
                return Box::pin(futures::future::ready(Outcome::Rejected(Value::new(
                    EngineError::CallDepthExceeded { limit },
                ))));
            }
        }
        drive(
            self.frame.runner.clone(),
            program,
            args,
            Arc::clone(&self.frame.signal),
            depth,
        )
    }

    /// Run `work` alongside the program.
    ///
    /// The work is owned by the invocation: it is dropped as soon as the
    /// invocation settles or is cancelled.
    pub fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.frame.spawn(Box::pin(work));
    }

    /// Fork `task` inside the invocation, resuming with its value or
    /// throwing its rejection.
    ///
    /// If the task cancels itself, the invocation is cancelled too.
    pub fn adopt(&self, task: Task<Value, Value>) {
        let k = self.clone();
        self.adopt_with(task, move |value| k.resume(value));
    }

    pub(crate) fn adopt_with<F>(&self, task: Task<Value, Value>, on_resolved: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let k = self.clone();
        let outcome = task.outcome();
        self.spawn(async move {
            match outcome.await {
                Outcome::Resolved(value) => on_resolved(value),
                Outcome::Rejected(error) => k.throw_error(error),
                Outcome::Cancelled => k.frame.signal.cancel(),
            }
        });
    }

    /// Returns true once the invocation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.frame.signal.is_cancelled()
    }

    /// Returns true once the invocation has resolved or rejected.
    pub fn is_settled(&self) -> bool {
        self.frame.is_settled()
    }

    /// Handle cancelling the invocation this continuation belongs to.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(Arc::clone(&self.frame.signal))
    }

    /// The runner interpreting the program.
    pub fn runner(&self) -> &Runner {
        &self.frame.runner
    }

    /// Nesting depth; the top-level invocation is 0.
    pub fn depth(&self) -> usize {
        self.frame.depth
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("depth", &self.frame.depth)
            .field("cancelled", &self.is_cancelled())
            .field("settled", &self.is_settled())
            .finish()
    }
}
