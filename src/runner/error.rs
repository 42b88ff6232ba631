//! Errors synthesized by the engine while an invocation runs.
//!
//! These are delivered as rejection values, wrapped in a [`Value`](crate::Value):
//!
//! ```rust
//! use ripple::runner::EngineError;
//! use ripple::Value;
//!
//! let rejection = Value::new(EngineError::CallDepthExceeded { limit: 4 });
//! let err = rejection.downcast::<EngineError>().unwrap();
//! assert_eq!(err.to_string(), "nested call depth exceeded the limit of 4");
//! ```

/// A failure raised by the engine itself rather than by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A performed operation has no implementation in the runner's table or
    /// in the default registry.
    UnrecognizedOperation {
        /// Effect that declared the operation.
        effect: String,
        /// Operation name that was looked up.
        operation: String,
    },
    /// Nested `call`s went deeper than the configured limit.
    CallDepthExceeded {
        /// The configured limit.
        limit: usize,
    },
    /// A default operation received arguments of the wrong shape.
    InvalidPayload {
        /// The operation.
        operation: String,
        /// What it expected, e.g. `"Duration"`.
        expected: String,
    },
}

impl EngineError {
    /// Name of the operation involved, if any.
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::UnrecognizedOperation { operation, .. }
            | Self::InvalidPayload { operation, .. } => Some(operation),
            Self::CallDepthExceeded { .. } => None,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedOperation { effect, operation } => write!(
                f,
                "unrecognized operation \"{}\" (effect \"{}\"): no handler and no default",
                operation, effect
            ),
            Self::CallDepthExceeded { limit } => {
                write!(f, "nested call depth exceeded the limit of {}", limit)
            }
            Self::InvalidPayload {
                operation,
                expected,
            } => write!(f, "operation \"{}\" expected {}", operation, expected),
        }
    }
}

impl std::error::Error for EngineError {}
