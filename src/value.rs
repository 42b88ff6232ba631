//! Type-erased values exchanged between programs and handlers.
//!
//! Operations carry payloads of arbitrary arity and type, and handlers resume
//! programs with whatever their operation produces. [`Value`] is the currency
//! for both: a boxed `Any + Send` that remembers the name of the type it was
//! built from, so failed downcasts and `Debug` output stay readable.

use std::any::{type_name, Any};
use std::fmt;

/// A dynamically typed, owned value.
///
/// # Example
///
/// ```rust
/// use ripple::Value;
///
/// let value = Value::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast::<i32>().ok(), Some(42));
/// ```
pub struct Value {
    inner: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Value {
    /// Wrap any `Send + 'static` value.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            inner: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// The unit value, used by operations that produce nothing.
    pub fn unit() -> Self {
        Self::new(())
    }

    /// Returns true if the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Take the wrapped value out as a `T`, or get the `Value` back unchanged.
    pub fn downcast<T: Any>(self) -> Result<T, Value> {
        let Value { inner, type_name } = self;
        match inner.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(inner) => Err(Value { inner, type_name }),
        }
    }

    /// Borrow the wrapped value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Name of the type this value was created from.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        macro_rules! show {
            ($($ty:ty),*) => {
                $(
                    if let Some(v) = self.downcast_ref::<$ty>() {
                        return f.debug_tuple("Value").field(v).finish();
                    }
                )*
            };
        }
        show!(
            (),
            bool,
            i32,
            i64,
            u32,
            u64,
            usize,
            f64,
            String,
            &'static str,
            crate::runner::EngineError
        );
        write!(f, "Value(<{}>)", self.type_name)
    }
}

/// Build a payload (`Vec<Value>`) from a list of expressions.
///
/// ```rust
/// use ripple::payload;
///
/// let args = payload![1_i32, "two".to_string()];
/// assert_eq!(args.len(), 2);
/// assert!(args[1].is::<String>());
/// ```
#[macro_export]
macro_rules! payload {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::new($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_to_wrong_type_returns_value() {
        let value = Value::new("hello".to_string());
        let value = value.downcast::<i32>().unwrap_err();
        assert_eq!(value.downcast::<String>().unwrap(), "hello");
    }

    #[test]
    fn debug_shows_common_types() {
        assert_eq!(format!("{:?}", Value::new(7_i32)), "Value(7)");
        assert_eq!(format!("{:?}", Value::unit()), "Value(())");
    }

    #[test]
    fn debug_falls_back_to_type_name() {
        struct Opaque;
        let rendered = format!("{:?}", Value::new(Opaque));
        assert!(rendered.contains("Opaque"));
    }

    #[test]
    fn payload_macro_wraps_each_argument() {
        let args = payload![1_i32, true];
        assert!(args[0].is::<i32>());
        assert!(args[1].is::<bool>());
        assert!(payload![].is_empty());
    }
}
