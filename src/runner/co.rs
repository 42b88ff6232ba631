//! The program side of the engine: suspending on operations and values.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::channel::{mpsc, oneshot};

use crate::effect::Operation;
use crate::value::Value;

/// A pinned, boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub(crate) enum Request {
    Perform(Operation),
    Yield(Value),
}

/// A program paused at a suspension point, with the channel that resumes it.
pub(crate) struct Suspension {
    pub(crate) request: Request,
    pub(crate) resume: oneshot::Sender<Value>,
}

/// Handle a running program uses to suspend itself.
///
/// Each suspension hands a request to the runner and waits for the value a
/// handler resumes it with. If the invocation ends instead (an early `end`,
/// a `throw_error`, or cancellation) the program is dropped at that point,
/// so destructors of its locals run as cleanup.
#[derive(Clone)]
pub struct Co {
    requests: mpsc::UnboundedSender<Suspension>,
}

impl Co {
    pub(crate) fn new(requests: mpsc::UnboundedSender<Suspension>) -> Self {
        Self { requests }
    }

    async fn suspend(&self, request: Request) -> Value {
        let (resume, resumed) = oneshot::channel();
        if self.requests.unbounded_send(Suspension { request, resume }).is_err() {
            return futures::future::pending().await;
        }
        match resumed.await {
            Ok(value) => value,
            // Nobody will resume this step.
            Err(_) => futures::future::pending().await,
        }
    }

    /// Request `operation` and wait for the handler's resume value.
    pub async fn perform(&self, operation: Operation) -> Value {
        self.suspend(Request::Perform(operation)).await
    }

    /// Hand a plain value to the runner's value policy.
    ///
    /// With the default policy a `Task<Value, Value>` is awaited (its
    /// rejection becomes the invocation's rejection) and anything else comes
    /// straight back.
    pub async fn yield_value(&self, value: Value) -> Value {
        self.suspend(Request::Yield(value)).await
    }
}

impl fmt::Debug for Co {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Co")
            .field("open", &!self.requests.is_closed())
            .finish()
    }
}

/// A re-invocable effectful computation.
///
/// Every `start` produces a fresh execution. Any
/// `Fn(Co, Vec<Value>) -> impl Future<Output = Result<Value, Value>>` closure
/// is a program.
///
/// ```rust
/// use ripple::runner::{Co, Program};
/// use ripple::Value;
///
/// async fn double(_co: Co, args: Vec<Value>) -> Result<Value, Value> {
///     let n = args.into_iter().next().ok_or_else(Value::unit)?.downcast::<i32>()?;
///     Ok(Value::new(n * 2))
/// }
///
/// fn assert_program<P: Program>(_: P) {}
/// assert_program(double);
/// ```
pub trait Program: Send + Sync + 'static {
    /// Begin one execution with the given arguments.
    fn start(&self, co: Co, args: Vec<Value>) -> BoxFuture<'static, Result<Value, Value>>;
}

impl<F, Fut> Program for F
where
    F: Fn(Co, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, Value>> + Send + 'static,
{
    fn start(&self, co: Co, args: Vec<Value>) -> BoxFuture<'static, Result<Value, Value>> {
        Box::pin(self(co, args))
    }
}

/// A shareable program, as carried in operation payloads.
pub type ProgramRef = Arc<dyn Program>;

/// Erase a program into a [`ProgramRef`].
pub fn program<P: Program>(program: P) -> ProgramRef {
    Arc::new(program)
}
