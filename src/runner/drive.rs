//! The interpreter loop.
//!
//! `drive` owns one execution of a program and everything it started. Each
//! turn it waits for the first of, in priority order: cancellation, a
//! settlement from a continuation, a suspension from the program, the
//! program finishing, or progress on side work spawned by handlers. Settling
//! or cancelling returns from the loop, which drops the program body and all
//! side work at once.

use std::sync::Arc;

use futures::channel::{mpsc, oneshot};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;

use super::cancel::CancelSignal;
use super::co::{BoxFuture, Co, ProgramRef, Request, Suspension};
use super::continuation::Continuation;
use super::error::EngineError;
use super::handlers::Step;
use super::Runner;
use crate::task::Outcome;
use crate::value::Value;

/// State shared between one execution and the continuations handed out for it.
pub(crate) struct Frame {
    pub(crate) runner: Runner,
    pub(crate) signal: Arc<CancelSignal>,
    pub(crate) depth: usize,
    settle: Mutex<Option<oneshot::Sender<Result<Value, Value>>>>,
    side: mpsc::UnboundedSender<BoxFuture<'static, ()>>,
}

impl Frame {
    /// Deliver the final result. Only the first call counts.
    pub(crate) fn settle(&self, result: Result<Value, Value>) -> bool {
        let sender = self.settle.lock().take();
        match sender {
            Some(sender) => sender.send(result).is_ok(),
            None => false,
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.settle.lock().is_none()
    }

    pub(crate) fn spawn(&self, work: BoxFuture<'static, ()>) {
        let _ = self.side.unbounded_send(work);
    }
}

pub(crate) fn drive(
    runner: Runner,
    program: ProgramRef,
    args: Vec<Value>,
    signal: Arc<CancelSignal>,
    depth: usize,
) -> BoxFuture<'static, Outcome<Value, Value>> {
    #[cfg(feature = "tracing")]
    let span = tracing::debug_span!(
        "invocation",
        label = runner.config().label().unwrap_or("-"),
        depth
    );

    let run = async move {
        let (requests, mut suspensions) = mpsc::unbounded::<Suspension>();
        let (settle, mut settled) = oneshot::channel();
        let (side, mut spawned) = mpsc::unbounded::<BoxFuture<'static, ()>>();
        let mut cancelled = Box::pin(signal.cancelled()).fuse();

        let frame = Arc::new(Frame {
            runner,
            signal,
            depth,
            settle: Mutex::new(Some(settle)),
            side,
        });

        let mut body = program.start(Co::new(requests), args).fuse();
        let mut side_work: FuturesUnordered<BoxFuture<'static, ()>> = FuturesUnordered::new();

        loop {
            futures::select_biased! {
                () = cancelled => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(depth, "invocation cancelled");
                    return Outcome::Cancelled;
                }
                result = settled => {
                    return match result {
                        Ok(Ok(value)) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(depth, "invocation resolved");
                            Outcome::Resolved(value)
                        }
                        Ok(Err(error)) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(depth, "invocation rejected");
                            Outcome::Rejected(error)
                        }
                        Err(_) => Outcome::Cancelled,
                    };
                }
                suspension = suspensions.next() => {
                    if let Some(suspension) = suspension {
                        dispatch(&frame, suspension);
                    }
                }
                result = body => match result {
                    Ok(value) => apply_value_policy(
                        Continuation::finished(Arc::clone(&frame)),
                        Step::Returned(value),
                    ),
                    Err(error) => {
                        frame.settle(Err(error));
                    }
                },
                work = spawned.next() => {
                    if let Some(work) = work {
                        side_work.push(work);
                    }
                }
                () = side_work.select_next_some() => {}
            }
        }
    };

    #[cfg(feature = "tracing")]
    let run = {
        use tracing::Instrument as _;
        run.instrument(span)
    };

    Box::pin(run)
}

fn dispatch(frame: &Arc<Frame>, suspension: Suspension) {
    let Suspension { request, resume } = suspension;
    let k = Continuation::new(Arc::clone(frame), Some(resume));
    match request {
        Request::Perform(operation) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                effect = %operation.effect(),
                operation = %operation.name(),
                depth = frame.depth,
                "dispatching operation"
            );
            match frame.runner.lookup(operation.name()) {
                Some(implementation) => implementation(k, operation.into_payload()),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        effect = %operation.effect(),
                        operation = %operation.name(),
                        "unrecognized operation"
                    );
                    k.throw_error(Value::new(EngineError::UnrecognizedOperation {
                        effect: operation.effect().to_string(),
                        operation: operation.name().to_string(),
                    }));
                }
            }
        }
        Request::Yield(value) => apply_value_policy(k, Step::Yielded(value)),
    }
}

fn apply_value_policy(k: Continuation, step: Step) {
    let policy = k.frame().runner.handlers().value_policy().cloned();
    match policy {
        Some(policy) => policy(k, step),
        None => super::value_policy::adopt_tasks(k, step),
    }
}
