// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::BTreeMap;

use crate::values::kind::{KindDescriptor, ValueKind};
use crate::values::typed::{TypedValue, ValueMap};

/// Named fields and their kinds: the declared inputs or outputs of a node.
///
/// Fields whose kind is nullable may be absent. Fields not declared by the shape are ignored by
/// validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape(pub BTreeMap<String, ValueKind>);

impl Shape {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, field: impl Into<String>, kind: ValueKind) -> Self {
        self.0.insert(field.into(), kind);
        self
    }

    pub fn get(&self, field: &str) -> Option<&ValueKind> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ValueKind)> {
        self.0.iter()
    }

    /// Resolve a dotted path (`user.address.zip`) to the kind it addresses.
    pub fn kind_at(&self, path: &str) -> Option<&ValueKind> {
        let segments: Vec<&str> = path.split('.').collect();
        let (head, rest) = segments.split_first()?;
        self.0.get(*head)?.field(rest)
    }

    /// Check `values` against every declared field, returning all per-field reasons.
    pub fn validate(&self, values: &ValueMap) -> Result<(), Vec<String>> {
        let reasons: Vec<String> = self
            .0
            .iter()
            .filter_map(|(field, kind)| match values.get(field) {
                Some(value) => kind
                    .validate(value)
                    .err()
                    .map(|reason| format!("{}: {}", field, reason)),
                None if kind.is_nullable() => None,
                None => Some(format!("{}: missing value", field)),
            })
            .collect();

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(reasons)
        }
    }

    /// Wrap a JSON object field-by-field using the declared kinds.
    pub fn wrap(&self, native: &serde_json::Value) -> Result<ValueMap, Vec<String>> {
        let empty = serde_json::Map::new();
        let object = match native {
            serde_json::Value::Object(object) => object,
            serde_json::Value::Null => &empty,
            _ => return Err(vec!["expected an object of named inputs".to_string()]),
        };

        let mut values = ValueMap::new();
        let mut reasons = Vec::new();
        for (field, kind) in &self.0 {
            match object.get(field) {
                Some(v) => match kind.wrap(v) {
                    Ok(wrapped) => {
                        values.insert(field.clone(), wrapped);
                    }
                    Err(reason) => reasons.push(format!("{}: {}", field, reason)),
                },
                None if kind.is_nullable() => {
                    values.insert(field.clone(), TypedValue::Null);
                }
                None => reasons.push(format!("{}: missing value", field)),
            }
        }

        if reasons.is_empty() {
            Ok(values)
        } else {
            Err(reasons)
        }
    }

    /// Unwrap declared fields into a JSON object. Undeclared fields are converted structurally.
    pub fn unwrap(&self, values: &ValueMap) -> serde_json::Value {
        let object = values
            .iter()
            .map(|(field, value)| {
                let native = match self.0.get(field) {
                    Some(kind) => kind.unwrap(value),
                    None => value.to_json(),
                };
                (field.clone(), native)
            })
            .collect();
        serde_json::Value::Object(object)
    }

    /// Required fields not covered by any of the `bound` input paths.
    ///
    /// A complex field counts as covered when it is bound whole, or when each of its required
    /// sub-fields is bound by a nested path (`address.city`, `address.zip`).
    pub fn unsatisfied<S: AsRef<str>>(&self, bound: &[S]) -> Vec<String> {
        let bound: Vec<&str> = bound.iter().map(AsRef::as_ref).collect();
        let mut missing = Vec::new();
        for (field, kind) in &self.0 {
            collect_unsatisfied(field, kind, &bound, &mut missing);
        }
        missing
    }

    pub fn describe(&self) -> BTreeMap<String, KindDescriptor> {
        self.0
            .iter()
            .map(|(field, kind)| (field.clone(), kind.describe()))
            .collect()
    }
}

fn collect_unsatisfied(path: &str, kind: &ValueKind, bound: &[&str], missing: &mut Vec<String>) {
    if bound.contains(&path) || kind.is_nullable() {
        return;
    }
    match kind {
        ValueKind::Complex(complex) => {
            let prefix = format!("{}.", path);
            if !bound.iter().any(|b| b.starts_with(&prefix)) {
                missing.push(path.to_string());
                return;
            }
            for (field, field_kind) in complex.fields() {
                collect_unsatisfied(&format!("{}{}", prefix, field), field_kind, bound, missing);
            }
        }
        _ => missing.push(path.to_string()),
    }
}

impl Serialize for Shape {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.describe().serialize(serializer)
    }
}

impl<K: Into<String>> FromIterator<(K, ValueKind)> for Shape {
    fn from_iter<T: IntoIterator<Item = (K, ValueKind)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
