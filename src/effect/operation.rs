//! Inert descriptions of requested effect calls.

use std::fmt;

use crate::value::Value;

/// A request for an effect, as data.
///
/// Building an `Operation` runs nothing. A program hands it to the runner
/// with [`Co::perform`](crate::runner::Co::perform), and the runner consumes
/// it in that same step by passing its payload to the matching handler.
pub struct Operation {
    effect: String,
    name: String,
    payload: Vec<Value>,
}

impl Operation {
    /// Describe a call of `name` on the effect `effect`.
    pub fn new(effect: impl Into<String>, name: impl Into<String>, payload: Vec<Value>) -> Self {
        Self {
            effect: effect.into(),
            name: name.into(),
            payload,
        }
    }

    /// Name of the effect that declared this operation.
    pub fn effect(&self) -> &str {
        &self.effect
    }

    /// Operation name, the key handlers are looked up by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments of the call.
    pub fn payload(&self) -> &[Value] {
        &self.payload
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.payload.len()
    }

    /// Take the arguments.
    pub fn into_payload(self) -> Vec<Value> {
        self.payload
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("effect", &self.effect)
            .field("name", &self.name)
            .field("payload", &self.payload)
            .finish()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}/{}", self.effect, self.name, self.payload.len())
    }
}
