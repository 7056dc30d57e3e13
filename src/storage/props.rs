use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// A property value: string, number, or homogeneous array thereof.
///
/// Values are stored JSON-encoded in the `s:<id>:props` hash, one field per
/// property. `serde_json::Number` keeps integers and floats lossless across
/// the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Str(String),
    Num(serde_json::Number),
    List(Vec<PropValue>),
}

impl PropValue {
    /// Reject nested lists and lists mixing strings with numbers.
    pub fn validate(&self) -> Result<(), WorldError> {
        let items = match self {
            PropValue::Str(_) | PropValue::Num(_) => return Ok(()),
            PropValue::List(items) => items,
        };
        let mut saw_str = false;
        let mut saw_num = false;
        for item in items {
            match item {
                PropValue::Str(_) => saw_str = true,
                PropValue::Num(_) => saw_num = true,
                PropValue::List(_) => {
                    return Err(WorldError::InvalidProperty(
                        "nested lists are not supported".to_string(),
                    ))
                }
            }
        }
        if saw_str && saw_num {
            return Err(WorldError::InvalidProperty(
                "lists must be homogeneous".to_string(),
            ));
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<String, WorldError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<PropValue, WorldError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(s)
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Num(n.into())
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        // NaN/infinity have no JSON form; map them to zero
        PropValue::Num(serde_json::Number::from_f64(n).unwrap_or_else(|| 0.into()))
    }
}

impl From<Vec<String>> for PropValue {
    fn from(items: Vec<String>) -> Self {
        PropValue::List(items.into_iter().map(PropValue::Str).collect())
    }
}
