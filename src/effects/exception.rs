//! Typed exceptions as an effect.

use std::any::Any;
use std::sync::Arc;

use crate::effect::{EffectDef, Operation, Signature};
use crate::runner::{Handlers, Runner};
use crate::value::Value;

/// The `Exception` effect: a single `throw(e)` operation.
///
/// How a throw is interpreted depends on the runner: [`Exception::handler`]
/// rejects the invocation with `e`, [`Exception::recover`] turns it into a
/// resolved value.
///
/// ```rust
/// use ripple::effects::Exception;
/// use ripple::runner::Co;
/// use ripple::{payload, Value};
///
/// # tokio_test::block_on(async {
/// let program = |co: Co, _args: Vec<Value>| async move {
///     co.perform(Exception::throw("boom".to_string())).await;
///     Ok::<_, Value>(Value::new("unreachable"))
/// };
///
/// let fallback = Exception::recover(|e| Value::new(format!("recovered from {:?}", e)));
/// let outcome = fallback.run(program, payload![]).await;
/// let text = outcome.resolved().unwrap().downcast::<String>().unwrap();
/// assert!(text.contains("boom"));
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Exception;

impl Exception {
    /// Effect name.
    pub const NAME: &'static str = "Exception";

    /// The effect definition.
    pub fn effect() -> EffectDef {
        EffectDef::builtin(Self::NAME, [("throw", Signature::procedure(["e"]))])
    }

    /// Raise `error`.
    pub fn throw<E: Any + Send>(error: E) -> Operation {
        Operation::new(Self::NAME, "throw", vec![Value::new(error)])
    }

    /// Reject the invocation with the thrown value.
    pub fn handler() -> Runner {
        Runner::new(Handlers::new().on("throw", |k, payload| {
            k.throw_error(payload.into_iter().next().unwrap_or_else(Value::unit));
        }))
    }

    /// End the invocation with `f(thrown)` instead of rejecting.
    pub fn recover<F>(f: F) -> Runner
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Runner::new(Handlers::new().on("throw", move |k, payload| {
            k.end(f(payload.into_iter().next().unwrap_or_else(Value::unit)));
        }))
    }
}
