//! `SendableValue`: the tagged JSON-shaped ABI used for tool arguments and
//! results. Unlike `serde_json::Value`, numeric coercion between int/double
//! happens only at declared schema boundaries (see [`crate::tool::schema`]),
//! never implicitly when constructing or comparing a value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Tagged union mirroring the JSON data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SendableValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<SendableValue>),
    Dict(BTreeMap<String, SendableValue>),
}

impl SendableValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SendableValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SendableValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, SendableValue>> {
        match self {
            SendableValue::Dict(d) => Some(d),
            _ => None,
        }
    }
}

impl From<Json> for SendableValue {
    fn from(value: Json) -> Self {
        match value {
            Json::Null => SendableValue::Null,
            Json::Bool(b) => SendableValue::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SendableValue::Int(i)
                } else {
                    SendableValue::Double(n.as_f64().unwrap_or_default())
                }
            }
            Json::String(s) => SendableValue::String(s),
            Json::Array(items) => SendableValue::Array(items.into_iter().map(Into::into).collect()),
            Json::Object(map) => SendableValue::Dict(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<SendableValue> for Json {
    fn from(value: SendableValue) -> Self {
        match value {
            SendableValue::Null => Json::Null,
            SendableValue::Bool(b) => Json::Bool(b),
            SendableValue::Int(i) => Json::Number(i.into()),
            SendableValue::Double(d) => {
                serde_json::Number::from_f64(d).map(Json::Number).unwrap_or(Json::Null)
            }
            SendableValue::String(s) => Json::String(s),
            SendableValue::Array(items) => Json::Array(items.into_iter().map(Into::into).collect()),
            SendableValue::Dict(map) => {
                Json::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
