//! The three-way terminal outcome shared by tasks and runner invocations.

/// How a task or an effect invocation finished.
///
/// Cancellation is its own branch rather than a flavour of failure: a
/// cancelled computation neither resolved nor rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome<T, E> {
    /// Finished with a value.
    Resolved(T),
    /// Finished with an error value.
    Rejected(E),
    /// Stopped before reaching either of the other outcomes.
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    /// Returns true for [`Outcome::Resolved`].
    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved(_))
    }

    /// Returns true for [`Outcome::Rejected`].
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    /// Returns true for [`Outcome::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// The resolved value, if any.
    pub fn resolved(self) -> Option<T> {
        match self {
            Outcome::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// The rejection value, if any.
    pub fn rejected(self) -> Option<E> {
        match self {
            Outcome::Rejected(error) => Some(error),
            _ => None,
        }
    }

    /// Collapse into a `Result`, with `None` standing for cancellation.
    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            Outcome::Resolved(value) => Some(Ok(value)),
            Outcome::Rejected(error) => Some(Err(error)),
            Outcome::Cancelled => None,
        }
    }

    /// Transform the resolved value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U, E> {
        match self {
            Outcome::Resolved(value) => Outcome::Resolved(f(value)),
            Outcome::Rejected(error) => Outcome::Rejected(error),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }

    /// Transform the rejection value.
    pub fn map_rejected<F>(self, f: impl FnOnce(E) -> F) -> Outcome<T, F> {
        match self {
            Outcome::Resolved(value) => Outcome::Resolved(value),
            Outcome::Rejected(error) => Outcome::Rejected(f(error)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Resolved(value),
            Err(error) => Outcome::Rejected(error),
        }
    }
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl<T, E> Arbitrary for Outcome<T, E>
where
    T: Arbitrary + 'static,
    E: Arbitrary + 'static,
{
    type Parameters = (T::Parameters, E::Parameters);
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        let (t_params, e_params) = args;
        prop_oneof![
            any_with::<T>(t_params).prop_map(Outcome::Resolved),
            any_with::<E>(e_params).prop_map(Outcome::Rejected),
            any::<()>().prop_map(|_| Outcome::Cancelled),
        ]
        .boxed()
    }
}
