//! Typed input bag handed to a check.
//!
//! Values are a closed set of scalars. Anything else is rejected when the bag
//! is built, so check logic only ever sees validated input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CheckError, CheckResult};
use crate::i18n::Params;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl DataValue {
    fn kind(&self) -> &'static str {
        match self {
            DataValue::Bool(_) => "bool",
            DataValue::Int(_) => "integer",
            DataValue::Float(_) => "float",
            DataValue::Text(_) => "string",
        }
    }
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataValue::Bool(v) => write!(f, "{v}"),
            DataValue::Int(v) => write!(f, "{v}"),
            DataValue::Float(v) => write!(f, "{v}"),
            DataValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::Int(v)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Float(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::Text(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::Text(v)
    }
}

/// Key/value input for one check invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckData(BTreeMap<String, DataValue>);

impl CheckData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DataValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entries of `other` win over entries of `self`.
    pub fn merged(&self, other: &CheckData) -> CheckData {
        let mut out = self.clone();
        for (key, value) in &other.0 {
            out.0.insert(key.clone(), value.clone());
        }
        out
    }

    pub fn text(&self, key: &str) -> CheckResult<&str> {
        match self.require(key)? {
            DataValue::Text(v) => Ok(v),
            other => Err(mismatch(key, "string", other)),
        }
    }

    pub fn int(&self, key: &str) -> CheckResult<i64> {
        match self.require(key)? {
            DataValue::Int(v) => Ok(*v),
            other => Err(mismatch(key, "integer", other)),
        }
    }

    pub fn float(&self, key: &str) -> CheckResult<f64> {
        match self.require(key)? {
            DataValue::Float(v) => Ok(*v),
            DataValue::Int(v) => Ok(*v as f64),
            other => Err(mismatch(key, "float", other)),
        }
    }

    pub fn bool(&self, key: &str) -> CheckResult<bool> {
        match self.require(key)? {
            DataValue::Bool(v) => Ok(*v),
            other => Err(mismatch(key, "bool", other)),
        }
    }

    /// Like [`CheckData::text`], but a missing key yields `None`.
    pub fn opt_text(&self, key: &str) -> CheckResult<Option<&str>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(_) => self.text(key).map(Some),
        }
    }

    /// Stringified entries, for message interpolation.
    pub fn to_params(&self) -> Params {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    fn require(&self, key: &str) -> CheckResult<&DataValue> {
        self.0.get(key).ok_or_else(|| CheckError::InvalidData {
            key: key.to_string(),
            reason: "missing".to_string(),
        })
    }
}

fn mismatch(key: &str, expected: &str, found: &DataValue) -> CheckError {
    CheckError::InvalidData {
        key: key.to_string(),
        reason: format!("expected {expected}, found {}", found.kind()),
    }
}

impl TryFrom<serde_json::Value> for CheckData {
    type Error = CheckError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        let object = match value {
            Value::Null => return Ok(CheckData::new()),
            Value::Object(object) => object,
            _ => {
                return Err(CheckError::InvalidData {
                    key: String::new(),
                    reason: "expected an object".to_string(),
                })
            }
        };

        let mut data = CheckData::new();
        for (key, value) in object {
            let value = match value {
                Value::Bool(v) => DataValue::Bool(v),
                Value::String(v) => DataValue::Text(v),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => DataValue::Int(i),
                    None => DataValue::Float(n.as_f64().unwrap_or_default()),
                },
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(CheckError::InvalidData {
                        key,
                        reason: "only scalar values are allowed".to_string(),
                    })
                }
            };
            data.0.insert(key, value);
        }
        Ok(data)
    }
}
