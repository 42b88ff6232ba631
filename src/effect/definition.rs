//! Effect definitions: named bundles of operation signatures.

use std::collections::BTreeMap;
use std::fmt;

use crate::effect::error::EffectError;
use crate::effect::operation::Operation;
use crate::operations;
use crate::runner::{Handlers, Runner, RunnerConfig};
use crate::value::Value;

/// The declared shape of one operation: parameter descriptions and an
/// optional result description.
///
/// Descriptions are free-form (`"a"`, `"a -> a"`, `"Duration"`); only the
/// parameter count is checked when operations are built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    params: Vec<String>,
    returns: Option<String>,
}

impl Signature {
    /// An operation taking `params` and producing `returns`.
    ///
    /// ```rust
    /// use ripple::effect::Signature;
    ///
    /// let update = Signature::func(["a -> a"], "a");
    /// assert_eq!(update.param_count(), 1);
    /// assert_eq!(update.to_string(), "(a -> a) -> a");
    /// ```
    pub fn func<I, S>(params: I, returns: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            returns: Some(returns.into()),
        }
    }

    /// An operation taking `params` and producing nothing of interest.
    pub fn procedure<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            returns: None,
        }
    }

    /// An operation with `count` undescribed parameters.
    pub fn arity(count: usize) -> Self {
        Self {
            params: vec!["*".to_string(); count],
            returns: None,
        }
    }

    /// Parameter descriptions.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Result description, if declared.
    pub fn returns(&self) -> Option<&str> {
        self.returns.as_deref()
    }

    /// Number of parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.params.join(", "))?;
        match &self.returns {
            Some(returns) => write!(f, " -> {}", returns),
            None => Ok(()),
        }
    }
}

/// A named effect: the operations it declares, and a factory for runners
/// that implement them.
///
/// # Example
///
/// ```rust
/// use ripple::effect::{EffectDef, Signature};
/// use ripple::runner::Handlers;
/// use ripple::{payload, Value};
///
/// let console = EffectDef::define(
///     "Console",
///     [("print", Signature::procedure(["String"]))],
/// )
/// .unwrap();
///
/// let op = console.operation("print", payload!["hi".to_string()]).unwrap();
/// assert_eq!(op.effect(), "Console");
///
/// // Every declared operation needs an implementation.
/// assert!(console.handler(Handlers::new()).is_err());
/// let runner = console
///     .handler(Handlers::new().on("print", |k, _args| k.resume(Value::unit())))
///     .unwrap();
/// # let _ = runner;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectDef {
    name: String,
    operations: BTreeMap<String, Signature>,
}

impl EffectDef {
    /// Define an effect. Operation names must be unique.
    pub fn define<N, I, K>(name: N, operations: I) -> Result<Self, EffectError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, Signature)>,
        K: Into<String>,
    {
        let name = name.into();
        let mut declared = BTreeMap::new();
        for (operation, signature) in operations {
            let operation = operation.into();
            if declared.contains_key(&operation) {
                return Err(EffectError::DuplicateOperation {
                    effect: name,
                    operation,
                });
            }
            declared.insert(operation, signature);
        }
        Ok(Self {
            name,
            operations: declared,
        })
    }

    /// Definition with names known to be distinct at compile time.
    pub(crate) fn builtin<const N: usize>(name: &str, operations: [(&str, Signature); N]) -> Self {
        Self {
            name: name.to_string(),
            operations: operations
                .into_iter()
                .map(|(operation, signature)| (operation.to_string(), signature))
                .collect(),
        }
    }

    /// The effect's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared operations keyed by name.
    pub fn operations(&self) -> &BTreeMap<String, Signature> {
        &self.operations
    }

    /// Declared operation names, sorted.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Signature of `operation`, if declared.
    pub fn signature(&self, operation: &str) -> Option<&Signature> {
        self.operations.get(operation)
    }

    /// Returns true if `operation` is declared.
    pub fn declares(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    /// Build an [`Operation`] value, checking the name and argument count.
    pub fn operation(
        &self,
        operation: &str,
        payload: Vec<Value>,
    ) -> Result<Operation, EffectError> {
        let signature = self
            .signature(operation)
            .ok_or_else(|| EffectError::UnknownOperation {
                effect: self.name.clone(),
                operation: operation.to_string(),
            })?;
        if signature.param_count() != payload.len() {
            return Err(EffectError::ArityMismatch {
                operation: operation.to_string(),
                expected: signature.param_count(),
                actual: payload.len(),
            });
        }
        Ok(Operation::new(self.name.clone(), operation, payload))
    }

    /// Declared operations that `handlers` would leave unimplemented.
    ///
    /// Names served by the default operation registry count as implemented
    /// when `config` enables it.
    pub fn missing_handlers(&self, handlers: &Handlers, config: &RunnerConfig) -> Vec<String> {
        self.operation_names()
            .filter(|name| {
                !handlers.contains(name)
                    && !(config.default_operations() && operations::is_default(name))
            })
            .map(str::to_string)
            .collect()
    }

    /// Build a runner for this effect, rejecting incomplete handler tables.
    pub fn handler(&self, handlers: Handlers) -> Result<Runner, EffectError> {
        self.handler_with_config(handlers, RunnerConfig::default())
    }

    /// [`EffectDef::handler`] with an explicit runner configuration.
    pub fn handler_with_config(
        &self,
        handlers: Handlers,
        config: RunnerConfig,
    ) -> Result<Runner, EffectError> {
        let missing = self.missing_handlers(&handlers, &config);
        if !missing.is_empty() {
            return Err(EffectError::MissingHandlers {
                effect: self.name.clone(),
                operations: missing,
            });
        }
        Ok(Runner::with_config(handlers, config))
    }

    /// Shorthand for `compose_effects(&[self, other])`.
    pub fn compose(&self, other: &EffectDef) -> EffectDef {
        compose_effects(&[self, other])
    }
}

/// Merge several effects into one.
///
/// The name joins the parts with `.` (any `.` inside a part becomes `_`).
/// Operations are unioned; when two effects declare the same operation the
/// later one's signature wins.
///
/// ```rust
/// use ripple::effect::{compose_effects, EffectDef, Signature};
///
/// let a = EffectDef::define("A", [("x", Signature::arity(0))]).unwrap();
/// let b = EffectDef::define("B.v2", [("y", Signature::arity(1))]).unwrap();
/// let ab = compose_effects(&[&a, &b]);
/// assert_eq!(ab.name(), "A.B_v2");
/// assert!(ab.declares("x") && ab.declares("y"));
/// ```
pub fn compose_effects(effects: &[&EffectDef]) -> EffectDef {
    let name = effects
        .iter()
        .map(|effect| effect.name.replace('.', "_"))
        .collect::<Vec<_>>()
        .join(".");

    let mut operations = BTreeMap::new();
    for effect in effects {
        for (operation, signature) in &effect.operations {
            let _previous = operations.insert(operation.clone(), signature.clone());
            #[cfg(feature = "tracing")]
            if _previous.is_some() {
                tracing::debug!(
                    effect = %effect.name,
                    operation = %operation,
                    "operation redeclared while composing effects; later declaration wins"
                );
            }
        }
    }

    EffectDef { name, operations }
}
