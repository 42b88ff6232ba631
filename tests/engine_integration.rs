//! End-to-end tests: one program, several interpreters.
//!
//! The same checkout program runs against a fake API, a recording logger and
//! a shared State cell, and is then re-interpreted with different handlers.

use std::time::Duration;

use ripple::effects::{LogLevel, Logger, State};
use ripple::operations;
use ripple::prelude::*;
use ripple::testing::FakeHandlers;
use ripple::{assert_cancelled, assert_rejected, assert_resolved, payload};

fn api() -> EffectDef {
    EffectDef::define(
        "Api",
        [
            ("price_of", Signature::func(["String"], "u32")),
            ("charge", Signature::func(["u32"], "String")),
        ],
    )
    .unwrap()
}

/// Sums the prices of the given items, records the running total in State,
/// charges the card and returns the receipt id.
fn checkout(api: EffectDef) -> impl Program {
    move |co: Co, args: Vec<Value>| {
        let api = api.clone();
        async move {
            let items = args
                .into_iter()
                .next()
                .ok_or_else(|| Value::new("no items".to_string()))?
                .downcast::<Vec<String>>()?;

            co.perform(State::set(0_u32)).await;
            for item in items {
                let price = co
                    .perform(api.operation("price_of", payload![item.clone()])?)
                    .await
                    .downcast::<u32>()?;
                co.perform(State::update(move |total: u32| total + price)).await;
                co.perform(Logger::debug(format!("added {}", item))).await;
            }

            let total = co.perform(State::get()).await.downcast::<u32>()?;
            co.perform(Logger::info(format!("charging {}", total))).await;
            let receipt = co.perform(api.operation("charge", payload![total])?).await;
            Ok::<_, Value>(receipt)
        }
    }
}

fn items(names: &[&str]) -> Vec<Value> {
    payload![names.iter().map(|s| s.to_string()).collect::<Vec<String>>()]
}

#[tokio::test]
async fn test_checkout_against_fakes() {
    let fake = FakeHandlers::new()
        .resume_with("price_of", 250_u32)
        .resume_with("charge", "receipt-1".to_string());
    let (logger, book) = Logger::recording();
    let runner = compose_handlers(&[&fake.runner(), &logger, &State::of(0_u32)]);

    let outcome = runner.run(checkout(api()), items(&["tea", "cake"])).await;
    let receipt = assert_resolved!(outcome).downcast::<String>().unwrap();

    assert_eq!(receipt, "receipt-1");
    assert_eq!(
        fake.operations(),
        vec!["price_of".to_string(), "price_of".to_string(), "charge".to_string()]
    );
    assert_eq!(fake.calls()[2].payload, vec!["Value(500)".to_string()]);
    assert_eq!(book.at(LogLevel::Info), vec!["charging 500".to_string()]);
    assert_eq!(book.at(LogLevel::Debug).len(), 2);
}

#[tokio::test]
async fn test_checkout_with_declined_card() {
    let fake = FakeHandlers::new()
        .resume_with("price_of", 1_u32)
        .throw_with("charge", "card declined".to_string());
    let (logger, _book) = Logger::recording();
    let runner = compose_handlers(&[&fake.runner(), &logger, &State::of(0_u32)]);

    let error = assert_rejected!(runner.run(checkout(api()), items(&["gum"])).await);
    assert_eq!(error.downcast::<String>().unwrap(), "card declined");
}

#[tokio::test]
async fn test_checkout_without_logger_fails_on_first_log_line() {
    let fake = FakeHandlers::new()
        .resume_with("price_of", 1_u32)
        .resume_with("charge", "r".to_string());
    let runner = fake.runner().concat(&State::of(0_u32));

    let error = assert_rejected!(runner.run(checkout(api()), items(&["gum"])).await);
    let error = error.downcast::<EngineError>().unwrap();
    assert_eq!(error.operation(), Some("debug"));
    // Nothing after the failing step ran.
    assert_eq!(fake.count("charge"), 0);
}

#[tokio::test]
async fn test_effect_handler_must_cover_composed_effect() {
    let composed = compose_effects(&[&api(), &State::effect()]);
    assert_eq!(composed.name(), "Api.State");

    let only_api = Handlers::new()
        .on("price_of", |k, _| k.resume(Value::new(1_u32)))
        .on("charge", |k, _| k.resume(Value::new("r".to_string())));
    match composed.handler(only_api) {
        Err(EffectError::MissingHandlers { operations, .. }) => {
            assert_eq!(operations, vec!["get", "set", "update"]);
        }
        other => panic!("expected missing handlers, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_state_is_shared_by_concurrent_invocations() {
    let runner = State::of(0_i64);
    let bump = |co: Co, _args: Vec<Value>| async move {
        for _ in 0..10 {
            co.perform(operations::sleep(Duration::from_millis(1))).await;
            co.perform(State::update(|n: i64| n + 1)).await;
        }
        Ok::<_, Value>(Value::unit())
    };

    let (a, b) = tokio::join!(runner.run(bump, payload![]), runner.run(bump, payload![]));
    assert!(a.is_resolved() && b.is_resolved());

    let read =
        |co: Co, _args: Vec<Value>| async move { Ok::<_, Value>(co.perform(State::get()).await) };
    let total = assert_resolved!(runner.run(read, payload![]).await);
    assert_eq!(total.downcast::<i64>().unwrap(), 20);
}

#[tokio::test]
async fn test_exception_recovery_composes_with_state() {
    let program = |co: Co, _args: Vec<Value>| async move {
        let n = co.perform(State::get()).await.downcast::<i32>()?;
        if n < 10 {
            co.perform(Exception::throw(format!("{} is too small", n))).await;
        }
        Ok::<_, Value>(Value::new(n))
    };

    let strict = compose_handlers(&[&State::of(3_i32), &Exception::handler()]);
    let error = assert_rejected!(strict.run(program, payload![]).await);
    assert_eq!(error.downcast::<String>().unwrap(), "3 is too small");

    let lenient = compose_handlers(&[
        &State::of(3_i32),
        &Exception::recover(|_| Value::new(10_i32)),
    ]);
    let value = assert_resolved!(lenient.run(program, payload![]).await);
    assert_eq!(value.downcast::<i32>().unwrap(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_built_from_race() {
    let slow = program(|co: Co, _args: Vec<Value>| async move {
        co.perform(operations::sleep(Duration::from_secs(30))).await;
        Ok::<_, Value>(Value::new("finished"))
    });
    let deadline = program(|co: Co, _args: Vec<Value>| async move {
        co.perform(operations::sleep(Duration::from_secs(5))).await;
        Err::<Value, _>(Value::new("timed out"))
    });

    let guarded = move |co: Co, _args: Vec<Value>| {
        let contenders = vec![slow.clone(), deadline.clone()];
        async move { Ok::<_, Value>(co.perform(operations::race(contenders)).await) }
    };

    let error = assert_rejected!(Runner::default().run(guarded, payload![]).await);
    assert_eq!(error.downcast::<&str>().unwrap(), "timed out");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_handle_stops_long_program() {
    let program = |co: Co, _args: Vec<Value>| async move {
        co.perform(operations::sleep(Duration::from_secs(3600))).await;
        Ok::<_, Value>(Value::unit())
    };
    let invocation = Runner::default().run(program, payload![]);
    let handle = invocation.cancel_handle();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
    });

    let start = tokio::time::Instant::now();
    assert_cancelled!(invocation.await);
    assert!(start.elapsed() < Duration::from_secs(2));
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_nested_call_through_default_operation() {
    let inner = program(|co: Co, args: Vec<Value>| async move {
        let base = co.perform(State::get()).await.downcast::<i32>()?;
        let add = args.into_iter().next().ok_or_else(Value::unit)?.downcast::<i32>()?;
        Ok::<_, Value>(Value::new(base + add))
    });
    let outer = move |co: Co, _args: Vec<Value>| {
        let inner = inner.clone();
        async move { Ok::<_, Value>(co.perform(operations::call(inner, payload![5_i32])).await) }
    };

    let value = assert_resolved!(State::of(37_i32).run(outer, payload![]).await);
    assert_eq!(value.downcast::<i32>().unwrap(), 42);
}
