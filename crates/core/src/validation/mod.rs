//! Declarative request validation.
//!
//! Each request type describes itself as an ordered list of
//! [`FieldCheck`]s; a fixed interpreter evaluates every rule in order and
//! collects all violations. No database access, no reflection.

pub mod evaluator;
pub mod rules;

pub use evaluator::{evaluate, Validate};
pub use rules::{FieldCheck, FieldViolation, Rule};
