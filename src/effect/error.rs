//! Errors raised while defining effects or building their handlers.

/// A definition-time problem with an effect or its handler table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// The same operation name was declared twice in one effect.
    DuplicateOperation {
        /// The effect being defined.
        effect: String,
        /// The repeated operation name.
        operation: String,
    },
    /// An operation was requested that the effect does not declare.
    UnknownOperation {
        /// The effect that was asked.
        effect: String,
        /// The name that is not declared.
        operation: String,
    },
    /// An operation was built with the wrong number of arguments.
    ArityMismatch {
        /// The operation being built.
        operation: String,
        /// Declared parameter count.
        expected: usize,
        /// Arguments supplied.
        actual: usize,
    },
    /// A handler table does not cover every declared operation.
    MissingHandlers {
        /// The effect whose handler was requested.
        effect: String,
        /// Declared operations without an implementation.
        operations: Vec<String>,
    },
}

impl EffectError {
    /// Returns true if this error reports missing handler entries.
    pub fn is_missing_handlers(&self) -> bool {
        matches!(self, Self::MissingHandlers { .. })
    }
}

impl std::fmt::Display for EffectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateOperation { effect, operation } => {
                write!(f, "operation \"{}\" declared twice in effect \"{}\"", operation, effect)
            }
            Self::UnknownOperation { effect, operation } => {
                write!(f, "effect \"{}\" has no operation \"{}\"", effect, operation)
            }
            Self::ArityMismatch {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "operation \"{}\" takes {} argument(s), got {}",
                operation, expected, actual
            ),
            Self::MissingHandlers { effect, operations } => write!(
                f,
                "handler for effect \"{}\" is missing operations: {}",
                effect,
                operations.join(", ")
            ),
        }
    }
}

impl std::error::Error for EffectError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_missing_operations() {
        let err = EffectError::MissingHandlers {
            effect: "State".to_string(),
            operations: vec!["get".to_string(), "set".to_string()],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("State"));
        assert!(rendered.contains("get, set"));
        assert!(err.is_missing_handlers());
    }

    #[test]
    fn display_arity() {
        let err = EffectError::ArityMismatch {
            operation: "set".to_string(),
            expected: 1,
            actual: 0,
        };
        assert_eq!(err.to_string(), "operation \"set\" takes 1 argument(s), got 0");
    }
}
