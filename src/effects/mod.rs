//! Ready-made effects.
//!
//! Each is an [`EffectDef`](crate::effect::EffectDef) plus handler factories
//! returning a [`Runner`](crate::runner::Runner); nothing else couples them to
//! the engine. Combine them with
//! [`compose_handlers`](crate::runner::compose_handlers):
//!
//! ```rust
//! use ripple::effects::{Logger, State};
//! use ripple::runner::{compose_handlers, Co};
//! use ripple::{payload, Value};
//!
//! # tokio_test::block_on(async {
//! let (logger, book) = Logger::recording();
//! let runner = compose_handlers(&[&State::of(0_u32), &logger]);
//!
//! let program = |co: Co, _args: Vec<Value>| async move {
//!     let n = co.perform(State::update(|n: u32| n + 1)).await.downcast::<u32>()?;
//!     co.perform(Logger::info(format!("count is {}", n))).await;
//!     Ok::<_, Value>(Value::unit())
//! };
//!
//! assert!(runner.run(program, payload![]).await.is_resolved());
//! assert_eq!(book.entries().len(), 1);
//! # });
//! ```

mod exception;
mod logger;
mod random;
mod state;

pub use exception::Exception;
pub use logger::{LogBook, LogLevel, Logger};
pub use random::Random;
pub use state::{State, Updater};
