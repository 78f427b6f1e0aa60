// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Field name to value map used for node inputs, node outputs and rule inputs.
pub type ValueMap = BTreeMap<String, TypedValue>;

/// A value flowing between rule stages.
///
/// `TypedValue` is the "typed" side of the value system; the loosely-typed native side is
/// `serde_json::Value`. Conversion from native to typed is either structural
/// ([`TypedValue::from_json`]) or kind-directed with coercion
/// ([`ValueKind::wrap`](crate::values::ValueKind::wrap)).
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Number(f64),
    Boolean(bool),
    /// A complex value: named fields, each itself a typed value
    Record(ValueMap),
    /// A collection of values of one entry kind
    List(Vec<TypedValue>),
    Null,
}

impl TypedValue {
    /// Structural conversion from JSON with no coercion.
    pub fn from_json(native: &serde_json::Value) -> Self {
        match native {
            serde_json::Value::Null => TypedValue::Null,
            serde_json::Value::Bool(b) => TypedValue::Boolean(*b),
            serde_json::Value::Number(n) => TypedValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => TypedValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                TypedValue::List(items.iter().map(TypedValue::from_json).collect())
            }
            serde_json::Value::Object(fields) => TypedValue::Record(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), TypedValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Structural conversion back to JSON.
    ///
    /// Integral numbers become JSON integers; NaN and infinities become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TypedValue::String(s) => serde_json::Value::String(s.clone()),
            TypedValue::Number(n) => number_to_json(*n),
            TypedValue::Boolean(b) => serde_json::Value::Bool(*b),
            TypedValue::Record(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            TypedValue::List(items) => {
                serde_json::Value::Array(items.iter().map(TypedValue::to_json).collect())
            }
            TypedValue::Null => serde_json::Value::Null,
        }
    }

    /// Short lowercase name of the variant, used in validation reasons.
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::String(_) => "string",
            TypedValue::Number(_) => "number",
            TypedValue::Boolean(_) => "boolean",
            TypedValue::Record(_) => "record",
            TypedValue::List(_) => "list",
            TypedValue::Null => "null",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[TypedValue]> {
        match self {
            TypedValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&ValueMap> {
        match self {
            TypedValue::Record(fields) => Some(fields),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::String(v.to_owned())
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::String(v)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Number(v)
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Number(v as f64)
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Boolean(v)
    }
}

impl<T: Into<TypedValue>> From<Vec<T>> for TypedValue {
    fn from(v: Vec<T>) -> Self {
        TypedValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// Largest integer an f64 represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// JSON form of a NUMBER.
///
/// Numbers carry no integer/float distinction, so `5.0` comes back as `5`. Compare round-tripped
/// numbers by value (`as_f64`), not by JSON representation.
pub(crate) fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Read a value out of a map by dotted path, descending into records.
///
/// `read_path(outputs, "user.age")` returns `outputs["user"]["age"]`.
pub fn read_path<'a>(values: &'a ValueMap, path: &str) -> Option<&'a TypedValue> {
    let mut segments = path.split('.');
    let mut current = values.get(segments.next()?)?;
    for segment in segments {
        current = current.as_record()?.get(segment)?;
    }
    Some(current)
}

/// Write a value into a map by dotted path, creating intermediate records.
pub fn insert_path(values: &mut ValueMap, path: &str, value: TypedValue) -> Result<(), String> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| "empty input path".to_string())?;

    let mut current = values;
    for segment in parents {
        let entry = current
            .entry((*segment).to_string())
            .or_insert_with(|| TypedValue::Record(ValueMap::new()));
        current = match entry {
            TypedValue::Record(fields) => fields,
            other => {
                return Err(format!(
                    "cannot write '{}': '{}' already holds a {}",
                    path,
                    segment,
                    other.type_name()
                ))
            }
        };
    }
    current.insert((*last).to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_is_structural() {
        let value = TypedValue::from_json(&json!({"a": [1, "x", true, null]}));
        let expected = TypedValue::Record(ValueMap::from([(
            "a".to_string(),
            TypedValue::List(vec![
                TypedValue::Number(1.0),
                TypedValue::String("x".into()),
                TypedValue::Boolean(true),
                TypedValue::Null,
            ]),
        )]));
        assert_eq!(value, expected);
    }

    #[test]
    fn test_to_json_keeps_integers_integral() {
        assert_eq!(TypedValue::Number(5.0).to_json(), json!(5));
        assert_eq!(TypedValue::Number(2.5).to_json(), json!(2.5));
        assert_eq!(TypedValue::Number(f64::NAN).to_json(), json!(null));
    }

    #[test]
    fn test_integral_floats_round_trip_by_value() {
        let native = json!(5.0);
        let back = TypedValue::from_json(&native).to_json();

        assert_ne!(back, native);
        assert_eq!(back, json!(5));
        assert_eq!(back.as_f64(), native.as_f64());
    }

    #[test]
    fn test_read_path_descends_into_records() {
        let outputs = ValueMap::from([(
            "user".to_string(),
            TypedValue::Record(ValueMap::from([("age".to_string(), TypedValue::Number(42.0))])),
        )]);

        assert_eq!(read_path(&outputs, "user.age"), Some(&TypedValue::Number(42.0)));
        assert!(read_path(&outputs, "user.name").is_none());
        assert!(read_path(&outputs, "missing").is_none());
    }

    #[test]
    fn test_insert_path_creates_records() {
        let mut inputs = ValueMap::new();
        insert_path(&mut inputs, "user.age", TypedValue::Number(42.0)).unwrap();
        insert_path(&mut inputs, "user.name", TypedValue::from("ann")).unwrap();

        let user = inputs.get("user").and_then(TypedValue::as_record).unwrap();
        assert_eq!(user.len(), 2);
    }

    #[test]
    fn test_insert_path_rejects_non_record_parent() {
        let mut inputs = ValueMap::from([("user".to_string(), TypedValue::from("ann"))]);
        let err = insert_path(&mut inputs, "user.age", TypedValue::Number(1.0)).unwrap_err();
        assert!(err.contains("already holds a string"));
    }

    #[test]
    fn test_serialize_as_plain_json() {
        let value = TypedValue::List(vec![TypedValue::Number(3.0), TypedValue::Boolean(false)]);
        assert_eq!(serde_json::to_string(&value).unwrap(), "[3,false]");
    }
}
