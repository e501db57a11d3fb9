//! Rule evaluator -- pure logic, no database access.

use validator::ValidateEmail;

use super::rules::{FieldCheck, FieldViolation, Rule};
use crate::error::{CoreError, CoreResult};

/// Implemented by every request type that is validated before reaching the
/// managers.
pub trait Validate {
    /// The ordered field checks describing this request.
    fn schema(&self) -> Vec<FieldCheck<'_>>;

    /// Evaluate the schema, failing with [`CoreError::Validation`] when any
    /// rule is violated.
    fn validate(&self) -> CoreResult<()> {
        let violations = evaluate(&self.schema());
        if violations.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(violations))
        }
    }
}

/// Evaluate all rules of all checks, returning every violation in schema
/// order.
pub fn evaluate(checks: &[FieldCheck<'_>]) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    for check in checks {
        for rule in check.rules {
            if let Some(message) = evaluate_rule(*rule, check) {
                violations.push(FieldViolation {
                    field_name: check.name.to_string(),
                    field: check.value.to_string(),
                    error: message,
                });
            }
        }
    }
    violations
}

fn evaluate_rule(rule: Rule, check: &FieldCheck<'_>) -> Option<String> {
    let name = check.name;
    let value = check.value;
    match rule {
        Rule::Required if value.is_empty() => Some(format!("{name} is required")),
        Rule::MinLen(min) if value.len() < min => {
            Some(format!("{name} must be at least {min} characters long"))
        }
        Rule::MaxLen(max) if value.len() > max => {
            Some(format!("{name} must be less than {max} characters long"))
        }
        Rule::Email if !value.to_string().validate_email() => {
            Some(format!("{value} must be a valid email address"))
        }
        _ => None,
    }
}
