//! Tool parameter schema, and the three-phase argument normalization
//! (default application, coercion, validation) run before every tool call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::SendableValue;

/// The declared type of a [`ToolParameter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Int,
    Double,
    Bool,
    Array(Box<ParameterType>),
    Object(Vec<ToolParameter>),
    OneOf(Vec<String>),
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub is_required: bool,
    pub default_value: Option<SendableValue>,
}

impl ToolParameter {
    pub fn required(name: impl Into<String>, description: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type,
            is_required: true,
            default_value: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        description: impl Into<String>,
        param_type: ParameterType,
        default_value: SendableValue,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type,
            is_required: false,
            default_value: Some(default_value),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

/// Error raised while normalizing arguments against a [`ToolSchema`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required parameter '{0}'")]
    MissingRequired(String),
    #[error("parameter '{path}' could not be coerced to {expected}: {got}")]
    CoercionFailed {
        path: String,
        expected: String,
        got: String,
    },
}

/// Normalize `arguments` against `parameters`: apply defaults, then coerce
/// loosely-typed values, then reject anything still missing or malformed.
///
/// Grounded in the three-phase protocol: default application, coercion,
/// validation. Recurses into `Array`/`Object` parameters so that nested
/// elements and sub-parameters go through the same three phases, with
/// [`SchemaError`] paths built up dotted (`outer.inner`) and indexed
/// (`outer[3]`) as the recursion descends.
pub fn normalize(
    parameters: &[ToolParameter],
    arguments: &BTreeMap<String, SendableValue>,
) -> Result<BTreeMap<String, SendableValue>, SchemaError> {
    normalize_at("", parameters, arguments)
}

fn normalize_at(
    path: &str,
    parameters: &[ToolParameter],
    arguments: &BTreeMap<String, SendableValue>,
) -> Result<BTreeMap<String, SendableValue>, SchemaError> {
    let mut out = arguments.clone();

    // Phase 1: default application.
    for param in parameters {
        if !out.contains_key(&param.name) {
            if let Some(default) = &param.default_value {
                out.insert(param.name.clone(), default.clone());
            }
        }
    }

    // Phase 2: coercion.
    for param in parameters {
        if let Some(value) = out.get(&param.name).cloned() {
            let field_path = join_path(path, &param.name);
            let coerced = coerce(&field_path, &param.param_type, value)?;
            out.insert(param.name.clone(), coerced);
        }
    }

    // Phase 3: validation (required presence).
    for param in parameters {
        if param.is_required && !out.contains_key(&param.name) {
            return Err(SchemaError::MissingRequired(join_path(path, &param.name)));
        }
    }

    Ok(out)
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn type_name(t: &ParameterType) -> String {
    match t {
        ParameterType::String => "string".into(),
        ParameterType::Int => "int".into(),
        ParameterType::Double => "double".into(),
        ParameterType::Bool => "bool".into(),
        ParameterType::Array(_) => "array".into(),
        ParameterType::Object(_) => "object".into(),
        ParameterType::OneOf(options) => format!("oneOf({})", options.join(",")),
        ParameterType::Any => "any".into(),
    }
}

fn coerce(path: &str, param_type: &ParameterType, value: SendableValue) -> Result<SendableValue, SchemaError> {
    match param_type {
        ParameterType::Any => Ok(value),
        ParameterType::String => match value {
            SendableValue::String(_) => Ok(value),
            other => Err(fail(path, param_type, debug_of(&other))),
        },
        ParameterType::Int => match value {
            SendableValue::Int(i) => Ok(SendableValue::Int(i)),
            SendableValue::Double(d) if d.fract() == 0.0 => Ok(SendableValue::Int(d as i64)),
            SendableValue::String(ref s) => s
                .trim()
                .parse::<i64>()
                .map(SendableValue::Int)
                .map_err(|_| fail(path, param_type, s.clone())),
            other => Err(fail(path, param_type, debug_of(&other))),
        },
        ParameterType::Double => match value {
            SendableValue::Double(d) => Ok(SendableValue::Double(d)),
            SendableValue::Int(i) => Ok(SendableValue::Double(i as f64)),
            SendableValue::String(ref s) => s
                .trim()
                .parse::<f64>()
                .map(SendableValue::Double)
                .map_err(|_| fail(path, param_type, s.clone())),
            other => Err(fail(path, param_type, debug_of(&other))),
        },
        ParameterType::Bool => match value {
            SendableValue::Bool(b) => Ok(SendableValue::Bool(b)),
            SendableValue::String(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(SendableValue::Bool(true)),
                "false" => Ok(SendableValue::Bool(false)),
                _ => Err(fail(path, param_type, s.clone())),
            },
            other => Err(fail(path, param_type, debug_of(&other))),
        },
        ParameterType::OneOf(options) => match value {
            SendableValue::String(ref s) => options
                .iter()
                .find(|opt| opt.eq_ignore_ascii_case(s.trim()))
                .cloned()
                .map(SendableValue::String)
                .ok_or_else(|| fail(path, param_type, s.clone())),
            other => Err(fail(path, param_type, debug_of(&other))),
        },
        ParameterType::Array(element_type) => match value {
            SendableValue::Array(items) => {
                let mut coerced = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    coerced.push(coerce(&format!("{path}[{index}]"), element_type, item)?);
                }
                Ok(SendableValue::Array(coerced))
            }
            other => Err(fail(path, param_type, debug_of(&other))),
        },
        ParameterType::Object(sub_parameters) => match value {
            SendableValue::Dict(fields) => {
                let normalized = normalize_at(path, sub_parameters, &fields)?;
                Ok(SendableValue::Dict(normalized))
            }
            other => Err(fail(path, param_type, debug_of(&other))),
        },
    }
}

fn fail(path: &str, param_type: &ParameterType, got: impl Into<String>) -> SchemaError {
    SchemaError::CoercionFailed {
        path: path.to_string(),
        expected: type_name(param_type),
        got: got.into(),
    }
}

fn debug_of(value: &SendableValue) -> String {
    format!("{:?}", value)
}
