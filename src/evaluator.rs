//! Condition evaluation.
//!
//! Transition conditions are small boolean expressions over one context
//! attribute, shaped `<attribute><operator><literal>` with operators drawn
//! from `=`, `!=`, `<`, `<=`, `>`, `>=`:
//!
//! - `x=1` - equality against an integer attribute
//! - `ratio>=0.5` - ordering against a float attribute
//! - `name!=abc` - string comparison (lexicographic)
//! - `enabled=true` - boolean comparison (`=` and `!=` only)
//!
//! A missing attribute never satisfies a condition; it is not an error.

use crate::context::Context;
use crate::error::FsmError;
use crate::value;
use serde_json::Value;

/// Decides whether a guarded transition fires.
///
/// Called by the engine with the machine's transition lock held; the
/// implementation must not re-enter the machine synchronously.
pub trait ConditionEvaluator: Send + Sync {
    fn is_satisfied(&self, condition: &str, context: &Context) -> Result<bool, FsmError>;
}

/// Default evaluator for the `<attribute><operator><literal>` condition form.
///
/// The comparison dispatches on the attribute's runtime type: booleans,
/// integers (signed and unsigned compared at 64-bit width), floats, and
/// strings are supported; anything else fails evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConditionEvaluator;

impl DefaultConditionEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl ConditionEvaluator for DefaultConditionEvaluator {
    fn is_satisfied(&self, condition: &str, context: &Context) -> Result<bool, FsmError> {
        let op = detect_operator(condition)?;
        let mut operands = condition.split(op);
        let name = operands.next().unwrap_or_default().trim();
        let literal = operands.next().unwrap_or_default().trim();

        let attribute = match context.get_attribute(name) {
            None | Some(Value::Null) => return Ok(false),
            Some(v) => v,
        };

        match &attribute {
            Value::Bool(b) => compare_bool(*b, value::parse(literal, "bool")?, op),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(compare(&i, &value::parse(literal, "integer")?, op))
                } else if let Some(u) = n.as_u64() {
                    Ok(compare(&u, &value::parse(literal, "unsigned integer")?, op))
                } else if let Some(f) = n.as_f64() {
                    Ok(compare(&f, &value::parse(literal, "float")?, op))
                } else {
                    Err(FsmError::UnsupportedAttributeType {
                        condition: condition.to_string(),
                        type_name: value::type_name(&attribute),
                    })
                }
            }
            Value::String(s) => Ok(compare(&s.as_str(), &literal, op)),
            other => Err(FsmError::UnsupportedAttributeType {
                condition: condition.to_string(),
                type_name: value::type_name(other),
            }),
        }
    }
}

/// Finds the comparison operator in a condition string.
///
/// Two-character operators are probed before the one-character operators
/// that prefix them, and a hit only counts when both operand positions are
/// non-empty (the operator is neither at the head nor in the tail).
fn detect_operator(condition: &str) -> Result<&'static str, FsmError> {
    for op in ["!=", "<=", "<", ">=", ">", "="] {
        if let Some(index) = condition.find(op) {
            if index > 0 && index + op.len() < condition.len() {
                return Ok(op);
            }
        }
    }

    Err(FsmError::NoOperator {
        condition: condition.to_string(),
    })
}

fn compare_bool(lhs: bool, rhs: bool, op: &str) -> Result<bool, FsmError> {
    match op {
        "=" => Ok(lhs == rhs),
        "!=" => Ok(lhs != rhs),
        _ => Err(FsmError::UnsupportedOperator {
            operator: op.to_string(),
            type_name: "bool",
        }),
    }
}

fn compare<T: PartialOrd>(lhs: &T, rhs: &T, op: &str) -> bool {
    match op {
        "=" => lhs == rhs,
        "!=" => lhs != rhs,
        "<" => lhs < rhs,
        "<=" => lhs <= rhs,
        ">" => lhs > rhs,
        ">=" => lhs >= rhs,
        _ => false,
    }
}
