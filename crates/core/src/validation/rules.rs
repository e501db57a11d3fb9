//! Validation rule and result types.

use serde::{Deserialize, Serialize};

/// A single constraint applied to a string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Field must not be empty.
    Required,
    /// Field must contain at least `n` characters.
    MinLen(usize),
    /// Field must contain at most `n` characters.
    MaxLen(usize),
    /// Field must be a syntactically valid email address.
    Email,
}

/// One entry of a request schema: a named field, its value, and the rules
/// to apply to it in order.
#[derive(Debug, Clone, Copy)]
pub struct FieldCheck<'a> {
    pub name: &'static str,
    pub value: &'a str,
    pub rules: &'static [Rule],
}

impl<'a> FieldCheck<'a> {
    pub fn new(name: &'static str, value: &'a str, rules: &'static [Rule]) -> Self {
        Self { name, value, rules }
    }
}

/// A single field-level rule violation.
///
/// Serialized with the wire names clients already depend on
/// (`FieldName`, `Field`, `Error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    #[serde(rename = "FieldName")]
    pub field_name: String,
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "Error")]
    pub error: String,
}
