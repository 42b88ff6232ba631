//! Effects Tour
//!
//! One program, interpreted several ways. Shows:
//! - Defining an effect and building operations from it
//! - State, Logger, Random and Exception handlers
//! - Default operations (sleep, parallel, race)
//! - Yielding a Task and forking a runner as a Task
//! - Cancelling an invocation
//!
//! Run with: cargo run --example effects_tour

use std::time::Duration;

use ripple::effects::{LogLevel, Logger, Random, State};
use ripple::operations;
use ripple::payload;
use ripple::prelude::*;

// ==================== A Domain Effect ====================

fn inventory() -> EffectDef {
    EffectDef::define(
        "Inventory",
        [
            ("stock", Signature::func(["String"], "u32")),
            ("reserve", Signature::func(["String", "u32"], "bool")),
        ],
    )
    .expect("operation names are distinct")
}

/// Reserve a random quantity of an item, keeping a running tally in State.
fn reserve_item(def: EffectDef) -> impl Program {
    move |co: Co, args: Vec<Value>| {
        let def = def.clone();
        async move {
            let item = args.into_iter().next().ok_or_else(Value::unit)?.downcast::<String>()?;
            let wanted = co.perform(Random::get_int(1, 5)).await.downcast::<i64>()? as u32;
            let stock = co
                .perform(def.operation("stock", payload![item.clone()])?)
                .await
                .downcast::<u32>()?;

            if stock < wanted {
                co.perform(Logger::warn(format!("only {} {} left", stock, item)))
                    .await;
                co.perform(Exception::throw(format!("cannot reserve {} {}", wanted, item)))
                    .await;
            }

            co.perform(def.operation("reserve", payload![item.clone(), wanted])?)
                .await;
            let total = co
                .perform(State::update(move |n: u32| n + wanted))
                .await
                .downcast::<u32>()?;
            co.perform(Logger::info(format!("reserved {} {}, {} in total", wanted, item, total)))
                .await;
            Ok::<_, Value>(Value::new(wanted))
        }
    }
}

fn warehouse(stock: u32) -> Runner {
    inventory()
        .handler(
            Handlers::new()
                .on("stock", move |k, _| k.resume(Value::new(stock)))
                .on("reserve", |k, _| k.resume(Value::new(true))),
        )
        .expect("warehouse covers the inventory effect")
}

// ==================== Examples ====================

/// Example 1: the same program against a well-stocked and an empty warehouse
async fn example_interpreters() {
    println!("\n=== Example 1: Swapping Interpreters ===");

    let (logger, book) = Logger::recording();
    let full = compose_handlers(&[
        &warehouse(100),
        &State::of(0_u32),
        &Random::seeded(7),
        &logger,
        &Exception::handler(),
    ]);
    let outcome = full
        .run(reserve_item(inventory()), payload!["widget".to_string()])
        .await
        .map(|value| value.downcast::<u32>().unwrap_or_default());
    println!("Full warehouse: {:?}", outcome);
    println!("Log: {:?}", book.at(LogLevel::Info));

    let empty = full.concat(&warehouse(0));
    let outcome = empty
        .run(reserve_item(inventory()), payload!["widget".to_string()])
        .await
        .map_rejected(|error| error.downcast::<String>().unwrap_or_default());
    println!("Empty warehouse: {:?}", outcome);

    let forgiving = empty.concat(&Exception::recover(|_| Value::new(0_u32)));
    let outcome = forgiving
        .run(reserve_item(inventory()), payload!["widget".to_string()])
        .await
        .map(|value| value.downcast::<u32>().unwrap_or_default());
    println!("Empty warehouse, recovered: {:?}", outcome);
}

/// Example 2: default operations need no handlers
async fn example_default_operations() {
    println!("\n=== Example 2: Default Operations ===");

    let tick = |label: &'static str, ms: u64| {
        program(move |co: Co, _args: Vec<Value>| async move {
            co.perform(operations::sleep(Duration::from_millis(ms))).await;
            Ok::<_, Value>(Value::new(label))
        })
    };

    let fan_out = move |co: Co, _args: Vec<Value>| {
        let (a, b, c) = (tick("a", 30), tick("b", 10), tick("c", 20));
        let (fast, slow) = (tick("fast", 5), tick("slow", 50));
        async move {
            let all = co
                .perform(operations::parallel(vec![a, b, c]))
                .await
                .downcast::<Vec<Value>>()?;
            let winner = co.perform(operations::race(vec![slow, fast])).await;
            Ok::<_, Value>(Value::new(format!("{:?} then {:?}", all, winner)))
        }
    };

    let outcome = Runner::default().run(fan_out, payload![]).await;
    println!("Result: {:?}", outcome.map(|v| v.downcast::<String>().unwrap_or_default()));
}

/// Example 3: tasks inside and outside programs
async fn example_tasks() {
    println!("\n=== Example 3: Tasks ===");

    let delayed = Task::<i32, String>::from_future(|| async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(21)
    });

    let program = move |co: Co, _args: Vec<Value>| {
        let delayed = delayed.map(Value::new).map_rejected(Value::new);
        async move {
            let n = co.yield_value(Value::new(delayed)).await.downcast::<i32>()?;
            Ok::<_, Value>(Value::new(n * 2))
        }
    };

    let task = Runner::default()
        .task(program, || payload![])
        .map(|value| value.downcast::<i32>().unwrap_or_default())
        .map_rejected(|_| "program failed".to_string());
    println!("Runner as task: {:?}", task.to_future().await);
}

/// Example 4: cancelling an invocation
async fn example_cancellation() {
    println!("\n=== Example 4: Cancellation ===");

    let heartbeat = |co: Co, _args: Vec<Value>| async move {
        for _ in 0..1_000 {
            co.perform(operations::sleep(Duration::from_millis(10))).await;
            co.perform(Logger::debug("still waiting")).await;
        }
        Ok::<_, Value>(Value::unit())
    };

    let (logger, book) = Logger::recording();
    let invocation = logger.run(heartbeat, payload![]);
    let handle = invocation.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(35)).await;
        handle.cancel();
    });

    println!("Outcome: {:?}", invocation.await);
    println!("Heartbeats before cancel: {}", book.len());
}

// ==================== Main ====================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Effects Tour");
    println!("============");

    example_interpreters().await;
    example_default_operations().await;
    example_tasks().await;
    example_cancellation().await;

    println!("\n=== All examples completed successfully! ===");
}
