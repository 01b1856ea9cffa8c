//! Flat query parameters for upstream calls.

use crate::{ApiError, Result};
use serde_json::{Number, Value};
use std::fmt;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Number(Number),
}

impl ParamValue {
    /// Convert a JSON argument into a parameter value.
    ///
    /// `null` is treated as absent. Booleans are stringified. Arrays and
    /// objects have no flat representation and are rejected.
    pub fn from_json(name: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(Self::Text(s.clone()))),
            Value::Number(n) => Ok(Some(Self::Number(n.clone()))),
            Value::Bool(b) => Ok(Some(Self::Text(b.to_string()))),
            Value::Array(_) | Value::Object(_) => Err(invalid(name, "expected a string or number")),
        }
    }

    /// Convert a JSON argument that must be an integer.
    ///
    /// Numeric strings such as `"14"` are accepted, since models frequently
    /// quote numbers.
    pub fn integer_from_json(name: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Some(Self::Number(n.clone()))),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|n| Some(Self::Number(n.into())))
                .map_err(|_| invalid(name, format!("expected an integer, got \"{s}\""))),
            other => Err(invalid(name, format!("expected an integer, got {other}"))),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> ApiError {
    ApiError::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Ordered set of query parameters, excluding `function` and `apikey`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter, keeping its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_replaces_in_place() {
        let mut params = Params::new();
        params.insert("interval", "daily");
        params.insert("time_period", 10_i64);
        params.insert("interval", "weekly");

        let pairs: Vec<_> = params.iter().map(|(k, v)| (k, v.to_string())).collect();
        assert_eq!(
            pairs,
            vec![("interval", "weekly".to_string()), ("time_period", "10".to_string())]
        );
    }

    #[test]
    fn json_scalars_convert() {
        assert_eq!(ParamValue::from_json("x", &json!(null)).unwrap(), None);
        assert_eq!(
            ParamValue::from_json("x", &json!(true)).unwrap(),
            Some(ParamValue::Text("true".into()))
        );
        assert_eq!(
            ParamValue::from_json("x", &json!(1.5)).unwrap().unwrap().to_string(),
            "1.5"
        );
        assert!(ParamValue::from_json("x", &json!(["a"])).is_err());
    }

    #[test]
    fn integer_coercion_accepts_numeric_strings_only() {
        assert_eq!(
            ParamValue::integer_from_json("time_period", &json!("14")).unwrap(),
            Some(ParamValue::from(14_i64))
        );
        let err = ParamValue::integer_from_json("time_period", &json!("ten")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter { ref name, .. } if name == "time_period"));
        assert!(ParamValue::integer_from_json("time_period", &json!(2.5)).is_err());
    }
}
