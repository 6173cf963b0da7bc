//! Action dispatch.
//!
//! Actions name an operation as `executor.method`. The default dispatcher
//! keeps an explicit registry: executors are registered by name, and each
//! executor maps method names to a typed invocable with a declared parameter
//! signature. Supplied parameters are coerced to the declared types before
//! the call.

use crate::context::Context;
use crate::error::FsmError;
use crate::machine::Action;
use crate::value;
use serde_json::Value;
use std::collections::HashMap;

/// Executes a named action with parameters.
///
/// Called by the engine with the machine's transition lock held; the
/// implementation must not re-enter the machine synchronously.
pub trait ActionDispatcher: Send + Sync {
    fn dispatch(&self, action: &Action, context: &Context) -> Result<(), FsmError>;
}

/// Declared parameter type of an executor method.
///
/// Supplied parameters are coerced by formatting to their string form and
/// reparsing as the destination type. [`ParamType::Raw`] passes the value
/// through unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    Raw,
}

type MethodFn = Box<dyn Fn(&[Value], &Context) -> Result<(), FsmError> + Send + Sync>;

struct Method {
    params: Vec<ParamType>,
    func: MethodFn,
}

/// A named bundle of invocable methods, registered with
/// [`DefaultActionDispatcher::add_executor`].
#[derive(Default)]
pub struct Executor {
    methods: HashMap<String, Method>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a method with its declared parameter signature.
    pub fn method<F>(mut self, name: impl Into<String>, params: &[ParamType], func: F) -> Self
    where
        F: Fn(&[Value], &Context) -> Result<(), FsmError> + Send + Sync + 'static,
    {
        self.methods.insert(
            name.into(),
            Method {
                params: params.to_vec(),
                func: Box::new(func),
            },
        );
        self
    }
}

/// Default [`ActionDispatcher`] backed by the executor registry.
#[derive(Default)]
pub struct DefaultActionDispatcher {
    executors: HashMap<String, Executor>,
}

impl DefaultActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an executor under a name. Action names reference it as
    /// `name.method`.
    pub fn add_executor(&mut self, name: impl Into<String>, executor: Executor) -> &mut Self {
        self.executors.insert(name.into(), executor);
        self
    }
}

impl ActionDispatcher for DefaultActionDispatcher {
    fn dispatch(&self, action: &Action, context: &Context) -> Result<(), FsmError> {
        let (executor_name, method_name) = split_action_name(&action.name)?;

        let executor =
            self.executors
                .get(executor_name)
                .ok_or_else(|| FsmError::UnknownExecutor {
                    executor: executor_name.to_string(),
                })?;

        let method = executor
            .methods
            .get(method_name)
            .ok_or_else(|| FsmError::UnknownMethod {
                executor: executor_name.to_string(),
                method: method_name.to_string(),
            })?;

        if method.params.len() != action.parameters.len() {
            return Err(FsmError::ParameterCountMismatch {
                name: action.name.clone(),
                expected: method.params.len(),
                actual: action.parameters.len(),
            });
        }

        let mut args = Vec::with_capacity(action.parameters.len());
        for (param, ty) in action.parameters.iter().zip(&method.params) {
            args.push(coerce(param, *ty)?);
        }

        (method.func)(&args, context)
    }
}

/// Splits an action name into its `executor.method` segments.
fn split_action_name(name: &str) -> Result<(&str, &str), FsmError> {
    let mut segments = name.split('.');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(executor), Some(method), None) if !executor.is_empty() && !method.is_empty() => {
            Ok((executor, method))
        }
        _ => Err(FsmError::MalformedActionName {
            name: name.to_string(),
        }),
    }
}

/// Coerces a supplied parameter to the declared destination type by
/// formatting it to its string form and reparsing.
fn coerce(param: &Value, ty: ParamType) -> Result<Value, FsmError> {
    if ty == ParamType::Raw {
        return Ok(param.clone());
    }

    let s = value::format(param);
    let coerced = match ty {
        ParamType::Bool => Value::Bool(value::parse(&s, "bool")?),
        ParamType::I8 => Value::from(value::parse::<i8>(&s, "i8")? as i64),
        ParamType::I16 => Value::from(value::parse::<i16>(&s, "i16")? as i64),
        ParamType::I32 => Value::from(value::parse::<i32>(&s, "i32")? as i64),
        ParamType::I64 => Value::from(value::parse::<i64>(&s, "i64")?),
        ParamType::U8 => Value::from(value::parse::<u8>(&s, "u8")? as u64),
        ParamType::U16 => Value::from(value::parse::<u16>(&s, "u16")? as u64),
        ParamType::U32 => Value::from(value::parse::<u32>(&s, "u32")? as u64),
        ParamType::U64 => Value::from(value::parse::<u64>(&s, "u64")?),
        ParamType::F32 => Value::from(value::parse::<f32>(&s, "f32")? as f64),
        ParamType::F64 => Value::from(value::parse::<f64>(&s, "f64")?),
        ParamType::Str => Value::String(s),
        ParamType::Raw => unreachable!("handled above"),
    };

    Ok(coerced)
}
