//! Session-scoped state: `get`, `set` and `update` over one shared cell.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::effect::{EffectDef, EffectError, Operation, Signature};
use crate::runner::{EngineError, Handlers, Runner};
use crate::value::Value;

/// Function carried by an `update` operation.
pub type Updater<T> = Arc<dyn Fn(T) -> T + Send + Sync + 'static>;

/// The `State` effect.
///
/// A runner from [`State::of`] closes over one private cell. Every
/// invocation of that runner (and of runners composed from it) reads and
/// writes the same cell, so concurrent programs observe each other's writes.
///
/// # Example
///
/// ```rust
/// use ripple::effects::State;
/// use ripple::runner::Co;
/// use ripple::{payload, Value};
///
/// # tokio_test::block_on(async {
/// let program = |co: Co, _args: Vec<Value>| async move {
///     co.perform(State::update(|n: i32| n + 1)).await;
///     co.perform(State::update(|n: i32| n * 10)).await;
///     Ok::<_, Value>(co.perform(State::get()).await)
/// };
///
/// let outcome = State::of(4_i32).run(program, payload![]).await;
/// assert_eq!(outcome.resolved().unwrap().downcast::<i32>().unwrap(), 50);
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct State;

impl State {
    /// Effect name.
    pub const NAME: &'static str = "State";

    /// The effect definition: `get()`, `set(a)`, `update(a -> a)`.
    pub fn effect() -> EffectDef {
        EffectDef::builtin(
            Self::NAME,
            [
                ("get", Signature::func(Vec::<String>::new(), "a")),
                ("set", Signature::func(["a"], "a")),
                ("update", Signature::func(["a -> a"], "a")),
            ],
        )
    }

    /// Read the current value.
    pub fn get() -> Operation {
        Operation::new(Self::NAME, "get", Vec::new())
    }

    /// Replace the value; resumes with the new value.
    pub fn set<T: Any + Send>(value: T) -> Operation {
        Operation::new(Self::NAME, "set", vec![Value::new(value)])
    }

    /// Apply `f` to the value; resumes with the result.
    pub fn update<T, F>(f: F) -> Operation
    where
        T: 'static,
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        let updater: Updater<T> = Arc::new(f);
        Operation::new(Self::NAME, "update", vec![Value::new(updater)])
    }

    /// A runner holding `initial` in a fresh cell.
    pub fn of<T>(initial: T) -> Runner
    where
        T: Clone + Send + Sync + 'static,
    {
        Runner::new(handlers(Arc::new(Mutex::new(initial))))
    }

    /// Like [`State::of`], for a custom effect declaring the same operations
    /// (for example a renamed copy of [`State::effect`]).
    pub fn of_effect<T>(initial: T, effect: &EffectDef) -> Result<Runner, EffectError>
    where
        T: Clone + Send + Sync + 'static,
    {
        effect.handler(handlers(Arc::new(Mutex::new(initial))))
    }
}

fn handlers<T>(cell: Arc<Mutex<T>>) -> Handlers
where
    T: Clone + Send + Sync + 'static,
{
    let (get_cell, set_cell, update_cell) = (Arc::clone(&cell), Arc::clone(&cell), cell);
    Handlers::new()
        .on("get", move |k, _| {
            let current = get_cell.lock().clone();
            k.resume(Value::new(current));
        })
        .on("set", move |k, payload| {
            match first::<T>("set", payload) {
                Ok(value) => {
                    *set_cell.lock() = value.clone();
                    k.resume(Value::new(value));
                }
                Err(error) => k.throw_error(error),
            }
        })
        .on("update", move |k, payload| {
            match first::<Updater<T>>("update", payload) {
                Ok(f) => {
                    let next = {
                        let mut current = update_cell.lock();
                        let next = f(current.clone());
                        *current = next.clone();
                        next
                    };
                    k.resume(Value::new(next));
                }
                Err(error) => k.throw_error(error),
            }
        })
}

fn first<T: Any>(operation: &str, payload: Vec<Value>) -> Result<T, Value> {
    payload
        .into_iter()
        .next()
        .and_then(|value| value.downcast::<T>().ok())
        .ok_or_else(|| {
            Value::new(EngineError::InvalidPayload {
                operation: operation.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;
    use crate::runner::Co;

    async fn read_int(co: Co, _args: Vec<Value>) -> Result<Value, Value> {
        Ok(co.perform(State::get()).await)
    }

    #[tokio::test]
    async fn set_resumes_with_new_value() {
        let program = |co: Co, _args: Vec<Value>| async move {
            Ok::<_, Value>(co.perform(State::set(9_i32)).await)
        };
        let outcome = State::of(0_i32).run(program, payload![]).await;
        assert_eq!(outcome.resolved().unwrap().downcast::<i32>().unwrap(), 9);
    }

    #[tokio::test]
    async fn cell_is_shared_across_invocations() {
        let runner = State::of(1_i32);
        let bump = |co: Co, _args: Vec<Value>| async move {
            Ok::<_, Value>(co.perform(State::update(|n: i32| n + 1)).await)
        };
        let _ = runner.run(bump, payload![]).await;
        let _ = runner.run(bump, payload![]).await;
        let outcome = runner.run(read_int, payload![]).await;
        assert_eq!(outcome.resolved().unwrap().downcast::<i32>().unwrap(), 3);
    }

    #[tokio::test]
    async fn separate_runners_have_separate_cells() {
        let a = State::of(1_i32);
        let b = State::of(1_i32);
        let set = |co: Co, _args: Vec<Value>| async move {
            Ok::<_, Value>(co.perform(State::set(5_i32)).await)
        };
        let _ = a.run(set, payload![]).await;
        let outcome = b.run(read_int, payload![]).await;
        assert_eq!(outcome.resolved().unwrap().downcast::<i32>().unwrap(), 1);
    }

    #[tokio::test]
    async fn wrong_type_rejects() {
        let program = |co: Co, _args: Vec<Value>| async move {
            Ok::<_, Value>(co.perform(State::set("text")).await)
        };
        let outcome = State::of(0_i32).run(program, payload![]).await;
        let error = outcome.rejected().unwrap().downcast::<EngineError>().unwrap();
        assert_eq!(error.operation(), Some("set"));
    }

    #[test]
    fn of_effect_checks_completeness() {
        let partial = EffectDef::define("Counter", [("get", Signature::arity(0))]).unwrap();
        assert!(State::of_effect(0_i32, &partial).is_ok());

        let wider = EffectDef::define(
            "Counter",
            [("get", Signature::arity(0)), ("reset", Signature::arity(0))],
        )
        .unwrap();
        assert!(State::of_effect(0_i32, &wider).is_err());
    }
}
