//! Loose-value helpers shared by the condition evaluator and the action
//! dispatcher.

use crate::error::FsmError;
use serde_json::Value;
use std::str::FromStr;

/// Renders a loosely typed value to the string form used for reparsing.
/// Strings render without quotes; everything else uses its JSON form.
pub(crate) fn format(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses a string into the requested primitive, failing with a
/// [`FsmError::ParseValue`] naming the destination type.
pub(crate) fn parse<T: FromStr>(input: &str, target: &'static str) -> Result<T, FsmError> {
    input.parse::<T>().map_err(|_| FsmError::ParseValue {
        value: input.to_string(),
        target,
    })
}

/// Returns a human-readable name for a value's runtime type.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() => "integer",
        Value::Number(n) if n.is_u64() => "unsigned integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format() {
        assert_eq!(format(&json!("abc")), "abc");
        assert_eq!(format(&json!(123)), "123");
        assert_eq!(format(&json!(true)), "true");
        assert_eq!(format(&json!(4.5)), "4.5");
    }

    #[test]
    fn test_parse_failure() {
        let err = parse::<i64>("abc", "i64").unwrap_err();
        assert!(matches!(err, FsmError::ParseValue { .. }));
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name(&json!(1)), "integer");
        assert_eq!(type_name(&json!(u64::MAX)), "unsigned integer");
        assert_eq!(type_name(&json!(1.5)), "float");
        assert_eq!(type_name(&json!([1])), "array");
    }
}
