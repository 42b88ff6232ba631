//! # Ripple
//!
//! > *"Describe the splash, let the pond decide the ripples"*
//!
//! Algebraic effects for Rust: write effectful programs as plain async code
//! that *describes* what it needs, and interpret those descriptions with
//! swappable handlers.
//!
//! ## Philosophy
//!
//! A program never performs I/O, reads a clock or touches shared state
//! directly. It performs [`Operation`](effect::Operation)s, inert values
//! naming an effect, an operation and a payload. A [`Runner`](runner::Runner)
//! decides what each operation means. Swap the runner and the same program
//! runs against real services, in-memory fakes, or a recording harness.
//!
//! ## Quick Example
//!
//! ```rust
//! use ripple::prelude::*;
//! use ripple::{assert_resolved, payload};
//!
//! # tokio_test::block_on(async {
//! let greeter = EffectDef::define(
//!     "Greeter",
//!     [("name", Signature::func(Vec::<String>::new(), "String"))],
//! )
//! .unwrap();
//!
//! let def = greeter.clone();
//! let program = move |co: Co, _args: Vec<Value>| {
//!     let def = def.clone();
//!     async move {
//!         let name = co.perform(def.operation("name", payload![])?).await;
//!         co.perform(Logger::info("greeting")).await;
//!         Ok::<_, Value>(Value::new(format!("hello, {}", name.downcast::<String>()?)))
//!     }
//! };
//!
//! let (logger, book) = Logger::recording();
//! let real = greeter
//!     .handler(Handlers::new().on("name", |k, _| k.resume(Value::new("world".to_string()))))
//!     .unwrap();
//!
//! let outcome = compose_handlers(&[&real, &logger]).run(program, payload![]).await;
//! let greeting = assert_resolved!(outcome).downcast::<String>().unwrap();
//! assert_eq!(greeting, "hello, world");
//! assert_eq!(book.len(), 1);
//! # });
//! ```
//!
//! ## Modules
//!
//! - [`effect`]: operations, effect definitions and their composition
//! - [`runner`]: the dispatch engine, handler tables and continuations
//! - [`task`]: [`Task`](task::Task), a lazy, cancellable async value
//! - [`effects`]: State, Exception, Logger and Random
//! - [`operations`]: the default operation registry (`sleep`, `call`, `race`, ...)
//! - [`testing`]: assertion macros and fake handlers

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod effect;
pub mod effects;
pub mod operations;
pub mod runner;
pub mod task;
pub mod testing;
mod value;

// Re-exports
pub use effect::{compose_effects, EffectDef, EffectError, Operation, Signature};
pub use runner::{compose_handlers, run, Co, Continuation, Handlers, Runner};
pub use task::{Outcome, Task};
pub use value::Value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::effect::{compose_effects, EffectDef, EffectError, Operation, Signature};
    pub use crate::effects::{Exception, Logger, Random, State};
    pub use crate::runner::{
        compose_handlers, program, Co, Continuation, EngineError, Handlers, Invocation, Program,
        ProgramRef, Runner, RunnerConfig, Step,
    };
    pub use crate::task::{Cancel, Cleanup, ForkHandlers, Outcome, Settle, Task};
    pub use crate::value::Value;
}
