//! Testing utilities for programs and tasks.
//!
//! This module provides assertion macros over [`Outcome`](crate::task::Outcome)
//! and [`FakeHandlers`], a recording handler table with canned responses, so
//! effectful programs can be tested without real side effects.
//!
//! # Examples
//!
//! ## Assertion Macros
//!
//! ```rust
//! use ripple::task::Outcome;
//! use ripple::{assert_cancelled, assert_rejected, assert_resolved};
//!
//! let value = assert_resolved!(Outcome::<i32, String>::Resolved(3));
//! assert_eq!(value, 3);
//!
//! assert_rejected!(Outcome::<i32, &str>::Rejected("nope"), "nope");
//! assert_cancelled!(Outcome::<i32, String>::Cancelled);
//! ```
//!
//! ## Fake Handlers
//!
//! ```rust
//! use ripple::effect::Operation;
//! use ripple::runner::Co;
//! use ripple::testing::FakeHandlers;
//! use ripple::{assert_resolved, payload, Value};
//!
//! # tokio_test::block_on(async {
//! let fake = FakeHandlers::new().resume_with("fetch_user", "ada".to_string());
//!
//! let program = |co: Co, _args: Vec<Value>| async move {
//!     let op = Operation::new("Api", "fetch_user", payload![17_u32]);
//!     Ok::<_, Value>(co.perform(op).await)
//! };
//!
//! let name = assert_resolved!(fake.runner().run(program, payload![]).await);
//! assert_eq!(name.downcast::<String>().unwrap(), "ada");
//! assert_eq!(fake.operations(), vec!["fetch_user".to_string()]);
//! assert_eq!(fake.calls()[0].payload, vec!["Value(17)".to_string()]);
//! # });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runner::{Continuation, Handlers, Runner};
use crate::value::Value;

/// Assert that an outcome resolved, evaluating to the resolved value.
///
/// With a second argument, also asserts the value equals it.
///
/// # Example
///
/// ```rust
/// use ripple::task::Outcome;
/// use ripple::assert_resolved;
///
/// assert_resolved!(Outcome::<_, ()>::Resolved(5), 5);
/// ```
#[macro_export]
macro_rules! assert_resolved {
    ($outcome:expr) => {
        match $outcome {
            $crate::task::Outcome::Resolved(value) => value,
            other => panic!("Expected Resolved, got {:?}", other),
        }
    };
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            $crate::task::Outcome::Resolved(value) => assert_eq!(value, $expected),
            other => panic!("Expected Resolved({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that an outcome rejected, evaluating to the rejection value.
///
/// With a second argument, also asserts the rejection equals it.
#[macro_export]
macro_rules! assert_rejected {
    ($outcome:expr) => {
        match $outcome {
            $crate::task::Outcome::Rejected(error) => error,
            other => panic!("Expected Rejected, got {:?}", other),
        }
    };
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            $crate::task::Outcome::Rejected(error) => assert_eq!(error, $expected),
            other => panic!("Expected Rejected({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that an outcome is [`Outcome::Cancelled`](crate::task::Outcome::Cancelled).
#[macro_export]
macro_rules! assert_cancelled {
    ($outcome:expr) => {
        match $outcome {
            $crate::task::Outcome::Cancelled => {}
            other => panic!("Expected Cancelled, got {:?}", other),
        }
    };
}

/// One operation received by a [`FakeHandlers`] table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Operation name.
    pub operation: String,
    /// `Debug` rendering of each payload value.
    pub payload: Vec<String>,
}

type Canned = Arc<dyn Fn() -> Value + Send + Sync + 'static>;

#[derive(Clone)]
enum Response {
    Resume(Canned),
    End(Canned),
    Throw(Canned),
}

/// A handler table for tests: records every call, answers with canned values.
///
/// Clones share the call log.
#[derive(Clone, Default)]
pub struct FakeHandlers {
    responses: HashMap<String, Response>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeHandlers {
    /// A table with no operations.
    pub fn new() -> Self {
        Self::default()
    }

    fn respond(mut self, operation: impl Into<String>, response: Response) -> Self {
        self.responses.insert(operation.into(), response);
        self
    }

    /// Resume `operation` with a clone of `value`.
    pub fn resume_with<T>(self, operation: impl Into<String>, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.respond(operation, Response::Resume(Arc::new(move || Value::new(value.clone()))))
    }

    /// End the invocation with a clone of `value` when `operation` runs.
    pub fn end_with<T>(self, operation: impl Into<String>, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.respond(operation, Response::End(Arc::new(move || Value::new(value.clone()))))
    }

    /// Reject the invocation with a clone of `error` when `operation` runs.
    pub fn throw_with<E>(self, operation: impl Into<String>, error: E) -> Self
    where
        E: Clone + Send + Sync + 'static,
    {
        self.respond(operation, Response::Throw(Arc::new(move || Value::new(error.clone()))))
    }

    /// The recording handler table.
    pub fn handlers(&self) -> Handlers {
        self.responses
            .iter()
            .fold(Handlers::new(), |handlers, (operation, response)| {
                let (name, response, calls) =
                    (operation.clone(), response.clone(), Arc::clone(&self.calls));
                handlers.on(operation.clone(), move |k: Continuation, payload| {
                    calls.lock().push(RecordedCall {
                        operation: name.clone(),
                        payload: payload.iter().map(|value| format!("{:?}", value)).collect(),
                    });
                    match &response {
                        Response::Resume(value) => k.resume(value()),
                        Response::End(value) => k.end(value()),
                        Response::Throw(error) => k.throw_error(error()),
                    }
                })
            })
    }

    /// A runner over [`handlers`](Self::handlers).
    pub fn runner(&self) -> Runner {
        Runner::new(self.handlers())
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Names of the operations received so far, in order.
    pub fn operations(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|call| call.operation.clone())
            .collect()
    }

    /// How many times `operation` was received.
    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }
}

impl fmt::Debug for FakeHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operations: Vec<&String> = self.responses.keys().collect();
        operations.sort();
        f.debug_struct("FakeHandlers")
            .field("operations", &operations)
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}
