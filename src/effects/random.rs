//! Randomness as an effect, seeded or drawn from the OS.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::effect::{EffectDef, Operation, Signature};
use crate::runner::{Continuation, EngineError, Handlers, Runner};
use crate::value::Value;

/// The `Random` effect.
///
/// | Operation | Resumes with |
/// |---|---|
/// | `number()` | `f64` in `[0, 1)` |
/// | `get_int(min, max)` | `i64` in `[min, max)` |
/// | `flip_coin()` | `bool` |
/// | `from_list(items)` | one element of the `Vec<Value>` |
///
/// ```rust
/// use ripple::effects::Random;
/// use ripple::runner::Co;
/// use ripple::{payload, Value};
///
/// # tokio_test::block_on(async {
/// let roll = |co: Co, _args: Vec<Value>| async move {
///     Ok::<_, Value>(co.perform(Random::get_int(1, 7)).await)
/// };
/// let a = Random::seeded(42).run(roll, payload![]).await.resolved().unwrap();
/// let b = Random::seeded(42).run(roll, payload![]).await.resolved().unwrap();
/// assert_eq!(a.downcast::<i64>().unwrap(), b.downcast::<i64>().unwrap());
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Random;

impl Random {
    /// Effect name.
    pub const NAME: &'static str = "Random";

    /// The effect definition.
    pub fn effect() -> EffectDef {
        EffectDef::builtin(
            Self::NAME,
            [
                ("number", Signature::func(Vec::<String>::new(), "f64")),
                ("get_int", Signature::func(["i64", "i64"], "i64")),
                ("flip_coin", Signature::func(Vec::<String>::new(), "bool")),
                ("from_list", Signature::func(["Vec<a>"], "a")),
            ],
        )
    }

    /// A float in `[0, 1)`.
    pub fn number() -> Operation {
        Operation::new(Self::NAME, "number", Vec::new())
    }

    /// An integer in `[min, max)`.
    pub fn get_int(min: i64, max: i64) -> Operation {
        Operation::new(Self::NAME, "get_int", vec![Value::new(min), Value::new(max)])
    }

    /// A fair coin flip.
    pub fn flip_coin() -> Operation {
        Operation::new(Self::NAME, "flip_coin", Vec::new())
    }

    /// One of `items`, chosen uniformly.
    pub fn from_list(items: Vec<Value>) -> Operation {
        Operation::new(Self::NAME, "from_list", vec![Value::new(items)])
    }

    /// Deterministic runner: the same seed yields the same sequence.
    pub fn seeded(seed: u64) -> Runner {
        Runner::new(handlers(StdRng::seed_from_u64(seed)))
    }

    /// Runner over a `StdRng` seeded once from the operating system.
    ///
    /// Every invocation of the runner draws from that one generator.
    pub fn unseeded() -> Runner {
        Runner::new(handlers(StdRng::from_os_rng()))
    }
}

fn invalid(operation: &str, expected: &str) -> Value {
    Value::new(EngineError::InvalidPayload {
        operation: operation.to_string(),
        expected: expected.to_string(),
    })
}

fn handlers(rng: StdRng) -> Handlers {
    let rng = Arc::new(Mutex::new(rng));
    let (number, int, coin, list) = (
        Arc::clone(&rng),
        Arc::clone(&rng),
        Arc::clone(&rng),
        rng,
    );
    Handlers::new()
        .on("number", move |k, _| {
            let n: f64 = number.lock().random();
            k.resume(Value::new(n));
        })
        .on("get_int", move |k: Continuation, payload| {
            let mut args = payload.into_iter().map(Value::downcast::<i64>);
            match (args.next(), args.next()) {
                (Some(Ok(min)), Some(Ok(max))) if min < max => {
                    let n = int.lock().random_range(min..max);
                    k.resume(Value::new(n));
                }
                _ => k.throw_error(invalid("get_int", "two i64 bounds with min < max")),
            }
        })
        .on("flip_coin", move |k, _| {
            let heads = coin.lock().random_bool(0.5);
            k.resume(Value::new(heads));
        })
        .on("from_list", move |k: Continuation, payload| {
            let items = payload
                .into_iter()
                .next()
                .and_then(|value| value.downcast::<Vec<Value>>().ok());
            match items {
                Some(mut items) if !items.is_empty() => {
                    let index = list.lock().random_range(0..items.len());
                    k.resume(items.swap_remove(index));
                }
                _ => k.throw_error(invalid("from_list", "a non-empty Vec<Value>")),
            }
        })
}
