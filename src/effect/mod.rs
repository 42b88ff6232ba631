//! Effects as data: operations, effect definitions and their composition.
//!
//! An [`EffectDef`] names a set of operations and their [`Signature`]s.
//! Programs request effects by performing [`Operation`] values built from a
//! definition; a [`Runner`](crate::runner::Runner) produced by
//! [`EffectDef::handler`] decides what each request means.
//!
//! Definitions are immutable. [`compose_effects`] builds a new definition
//! whose operation set is the union of its inputs.

mod definition;
mod error;
mod operation;

pub use definition::{compose_effects, EffectDef, Signature};
pub use error::EffectError;
pub use operation::Operation;
