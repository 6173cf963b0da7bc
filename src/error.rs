//! Crate error types.

use thiserror::Error;

/// Errors from the state machine engine and its default policy objects.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("conditional transition requires a condition evaluator")]
    MissingEvaluator,

    #[error("entry and exit actions require an action dispatcher")]
    MissingDispatcher,

    #[error("state timeouts require a timeout event")]
    MissingTimeoutEvent,

    #[error("unknown state: '{state_id}'")]
    UnknownState { state_id: String },

    #[error("action name must be 'executor.method', got '{name}'")]
    MalformedActionName { name: String },

    #[error("no action executor registered for '{executor}'")]
    UnknownExecutor { executor: String },

    #[error("executor '{executor}' has no method '{method}'")]
    UnknownMethod { executor: String, method: String },

    #[error("method '{name}' takes {expected} parameters, {actual} supplied")]
    ParameterCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("action failed: {reason}")]
    ActionFailed { reason: String },

    #[error("no operator in condition '{condition}'")]
    NoOperator { condition: String },

    #[error("unsupported attribute type '{type_name}' for condition '{condition}'")]
    UnsupportedAttributeType {
        condition: String,
        type_name: &'static str,
    },

    #[error("operator '{operator}' is not supported for {type_name} comparison")]
    UnsupportedOperator {
        operator: String,
        type_name: &'static str,
    },

    #[error("cannot parse '{value}' as {target}")]
    ParseValue {
        value: String,
        target: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl FsmError {
    /// Returns the error category code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            FsmError::MissingEvaluator
            | FsmError::MissingDispatcher
            | FsmError::MissingTimeoutEvent
            | FsmError::UnknownState { .. }
            | FsmError::Io(_)
            | FsmError::Json(_)
            | FsmError::Yaml(_) => "CONFIGURATION_ERROR",

            FsmError::MalformedActionName { .. }
            | FsmError::UnknownExecutor { .. }
            | FsmError::UnknownMethod { .. }
            | FsmError::ParameterCountMismatch { .. }
            | FsmError::ActionFailed { .. } => "DISPATCH_ERROR",

            FsmError::NoOperator { .. }
            | FsmError::UnsupportedAttributeType { .. }
            | FsmError::UnsupportedOperator { .. } => "EVALUATION_ERROR",

            FsmError::ParseValue { .. } => "PARSE_ERROR",
        }
    }
}
