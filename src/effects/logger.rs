//! Structured logging as an effect.
//!
//! Programs describe what to log; the runner decides where it goes. The
//! default handler forwards every line to `tracing`; [`Logger::recording`]
//! keeps lines in memory for assertions.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::effect::{EffectDef, Operation, Signature};
use crate::runner::{Continuation, EngineError, Handlers, Runner};
use crate::value::Value;

/// Severity of a logged line. `Log` is the plain, unlevelled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// `log`
    Log,
    /// `debug`
    Debug,
    /// `info`
    Info,
    /// `warn`
    Warn,
    /// `error`
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Log,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Operation name for this level.
    pub fn operation(self) -> &'static str {
        match self {
            LogLevel::Log => "log",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// Lines captured by a recording logger.
#[derive(Debug, Clone, Default)]
pub struct LogBook {
    lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl LogBook {
    fn push(&self, level: LogLevel, message: String) {
        self.lines.lock().push((level, message));
    }

    /// Everything logged so far, in order.
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().clone()
    }

    /// Messages logged at `level`.
    pub fn at(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Number of captured lines.
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Returns true if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

/// The `Logger` effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Logger {
    /// Effect name.
    pub const NAME: &'static str = "Logger";

    /// The effect definition: one single-argument operation per level.
    pub fn effect() -> EffectDef {
        EffectDef::builtin(
            Self::NAME,
            LogLevel::ALL.map(|level| (level.operation(), Signature::procedure(["String"]))),
        )
    }

    /// Log `message` at `level`.
    pub fn at(level: LogLevel, message: impl Into<String>) -> Operation {
        Operation::new(Self::NAME, level.operation(), vec![Value::new(message.into())])
    }

    /// Unlevelled line.
    pub fn log(message: impl Into<String>) -> Operation {
        Self::at(LogLevel::Log, message)
    }

    /// Debug line.
    pub fn debug(message: impl Into<String>) -> Operation {
        Self::at(LogLevel::Debug, message)
    }

    /// Info line.
    pub fn info(message: impl Into<String>) -> Operation {
        Self::at(LogLevel::Info, message)
    }

    /// Warning line.
    pub fn warn(message: impl Into<String>) -> Operation {
        Self::at(LogLevel::Warn, message)
    }

    /// Error line.
    pub fn error(message: impl Into<String>) -> Operation {
        Self::at(LogLevel::Error, message)
    }

    /// Forward every line to a `tracing` event of the matching level.
    /// `log` lines are emitted at info level.
    #[cfg(feature = "tracing")]
    pub fn handler() -> Runner {
        Runner::new(table(|level, message| match level {
            LogLevel::Debug => tracing::debug!(target: "ripple::logger", "{}", message),
            LogLevel::Log | LogLevel::Info => {
                tracing::info!(target: "ripple::logger", "{}", message)
            }
            LogLevel::Warn => tracing::warn!(target: "ripple::logger", "{}", message),
            LogLevel::Error => tracing::error!(target: "ripple::logger", "{}", message),
        }))
    }

    /// Capture lines in memory.
    pub fn recording() -> (Runner, LogBook) {
        let book = LogBook::default();
        let sink = book.clone();
        let runner = Runner::new(table(move |level, message| sink.push(level, message)));
        (runner, book)
    }
}

fn table<F>(sink: F) -> Handlers
where
    F: Fn(LogLevel, String) + Send + Sync + 'static,
{
    let sink = Arc::new(sink);
    LogLevel::ALL.iter().fold(Handlers::new(), |handlers, &level| {
        let sink = Arc::clone(&sink);
        handlers.on(level.operation(), move |k: Continuation, payload| {
            match payload.into_iter().next().map(Value::downcast::<String>) {
                Some(Ok(message)) => {
                    sink(level, message);
                    k.resume(Value::unit());
                }
                _ => k.throw_error(Value::new(EngineError::InvalidPayload {
                    operation: level.operation().to_string(),
                    expected: "a String".to_string(),
                })),
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;
    use crate::runner::Co;

    async fn chatty(co: Co, _args: Vec<Value>) -> Result<Value, Value> {
        co.perform(Logger::info("starting")).await;
        co.perform(Logger::warn("low on coffee")).await;
        co.perform(Logger::log("plain")).await;
        Ok(Value::unit())
    }

    #[tokio::test]
    async fn recording_keeps_order_and_levels() {
        let (runner, book) = Logger::recording();
        assert!(runner.run(chatty, payload![]).await.is_resolved());
        assert_eq!(book.len(), 3);
        assert_eq!(book.entries()[0], (LogLevel::Info, "starting".to_string()));
        assert_eq!(book.at(LogLevel::Warn), vec!["low on coffee".to_string()]);
    }

    #[tokio::test]
    async fn non_string_payload_rejects() {
        let (runner, book) = Logger::recording();
        let program = |co: Co, _args: Vec<Value>| async move {
            co.perform(Operation::new(Logger::NAME, "info", payload![3_i32])).await;
            Ok::<_, Value>(Value::unit())
        };
        assert!(runner.run(program, payload![]).await.is_rejected());
        assert!(book.is_empty());
    }

    #[cfg(feature = "tracing")]
    #[tokio::test]
    #[tracing_test::traced_test]
    async fn handler_emits_tracing_events() {
        let outcome = Logger::handler().run(chatty, payload![]).await;
        assert!(outcome.is_resolved());
        assert!(logs_contain("starting"));
        assert!(logs_contain("low on coffee"));
    }

    #[test]
    fn effect_declares_every_level() {
        let effect = Logger::effect();
        for level in LogLevel::ALL {
            assert!(effect.declares(level.operation()));
        }
    }
}
