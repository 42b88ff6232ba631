//! Runner configuration.

/// Nested `call` depth allowed by default.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Settings shared by every invocation of a runner.
///
/// Configs are plain data built with `with_*` methods.
///
/// # Examples
///
/// ```rust
/// use ripple::runner::RunnerConfig;
///
/// let config = RunnerConfig::default()
///     .with_default_operations(false)
///     .with_max_call_depth(Some(8))
///     .with_label("checkout");
///
/// assert!(!config.default_operations());
/// assert_eq!(config.max_call_depth(), Some(8));
/// assert_eq!(config.label(), Some("checkout"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    default_operations: bool,
    max_call_depth: Option<usize>,
    label: Option<&'static str>,
}

impl RunnerConfig {
    /// Toggle the fallback to the default operation registry.
    pub fn with_default_operations(mut self, enabled: bool) -> Self {
        self.default_operations = enabled;
        self
    }

    /// Bound nested `call` recursion. `None` removes the bound.
    pub fn with_max_call_depth(mut self, limit: Option<usize>) -> Self {
        self.max_call_depth = limit;
        self
    }

    /// Label recorded on the `invocation` tracing span.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Whether unknown operation names fall back to the default registry.
    pub fn default_operations(&self) -> bool {
        self.default_operations
    }

    /// Maximum nesting depth for `call`.
    pub fn max_call_depth(&self) -> Option<usize> {
        self.max_call_depth
    }

    /// Label for tracing output.
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_operations: true,
            max_call_depth: Some(DEFAULT_MAX_CALL_DEPTH),
            label: None,
        }
    }
}
