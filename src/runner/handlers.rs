//! Handler tables: operation implementations keyed by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::continuation::Continuation;
use crate::value::Value;

/// Implementation of one operation: receives the continuation and the
/// operation's payload.
pub type OperationFn = Arc<dyn Fn(Continuation, Vec<Value>) + Send + Sync + 'static>;

/// Policy for anything a program produces that is not an operation.
pub type ValueFn = Arc<dyn Fn(Continuation, Step) + Send + Sync + 'static>;

/// A non-operation step of a program, handed to the value policy.
#[derive(Debug)]
pub enum Step {
    /// The program yielded a plain value with [`Co::yield_value`](super::Co::yield_value)
    /// and waits to be resumed.
    Yielded(Value),
    /// The program finished with this value. Resuming the continuation
    /// ends the invocation with the resumed value.
    Returned(Value),
}

impl Step {
    /// The value carried by either variant.
    pub fn into_value(self) -> Value {
        match self {
            Step::Yielded(v) | Step::Returned(v) => v,
        }
    }
}

/// Operation implementations plus an optional value policy.
///
/// # Example
///
/// ```rust
/// use ripple::runner::Handlers;
/// use ripple::Value;
///
/// let handlers = Handlers::new()
///     .on("answer", |k, _args| k.resume(Value::new(42_i32)))
///     .on("stop", |k, _args| k.end(Value::unit()));
///
/// assert!(handlers.contains("answer"));
/// assert_eq!(handlers.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Handlers {
    operations: HashMap<String, OperationFn>,
    value: Option<ValueFn>,
}

impl Handlers {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Implement `operation`. Replaces any existing entry of that name.
    pub fn on<F>(mut self, operation: impl Into<String>, f: F) -> Self
    where
        F: Fn(Continuation, Vec<Value>) + Send + Sync + 'static,
    {
        self.operations.insert(operation.into(), Arc::new(f));
        self
    }

    /// Install a value policy, replacing the default Task adoption.
    pub fn on_value<F>(mut self, f: F) -> Self
    where
        F: Fn(Continuation, Step) + Send + Sync + 'static,
    {
        self.value = Some(Arc::new(f));
        self
    }

    /// Returns true if `operation` has an implementation here.
    pub fn contains(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    /// Implemented operation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of implemented operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if no operation is implemented.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Union of two tables. `other` wins on name collisions, and its value
    /// policy (if any) replaces ours.
    pub fn merge(mut self, other: &Handlers) -> Self {
        for (name, f) in &other.operations {
            self.operations.insert(name.clone(), Arc::clone(f));
        }
        if let Some(value) = &other.value {
            self.value = Some(Arc::clone(value));
        }
        self
    }

    pub(crate) fn get(&self, operation: &str) -> Option<&OperationFn> {
        self.operations.get(operation)
    }

    pub(crate) fn value_policy(&self) -> Option<&ValueFn> {
        self.value.as_ref()
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("operations", &self.names())
            .field("value_policy", &self.value.is_some())
            .finish()
    }
}
