// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Value kinds: the types that may appear on node inputs/outputs and rule-stage wiring.
//!
//! Every kind offers the same three operations:
//!
//! * `validate` - strict check of a [`TypedValue`] against the kind
//! * `wrap` - native JSON to typed value, coercing loosely-typed primitives
//! * `unwrap` - typed value back to native JSON
//!
//! Complex and collection kinds apply these recursively to their fields/entries.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::values::typed::{number_to_json, TypedValue, ValueMap};

const COLLECTION_SUFFIX: &str = ".COLLECTION";
const NULLABLE_SUFFIX: &str = ".NULLABLE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
}

impl PrimitiveKind {
    pub fn id(self) -> &'static str {
        match self {
            PrimitiveKind::String => "STRING",
            PrimitiveKind::Number => "NUMBER",
            PrimitiveKind::Boolean => "BOOLEAN",
        }
    }

    fn validate(self, value: &TypedValue) -> Result<(), String> {
        match (self, value) {
            (PrimitiveKind::String, TypedValue::String(_)) => Ok(()),
            (PrimitiveKind::Boolean, TypedValue::Boolean(_)) => Ok(()),
            (PrimitiveKind::Number, TypedValue::Number(n)) if n.is_nan() => {
                Err("expected NUMBER, got NaN".to_string())
            }
            (PrimitiveKind::Number, TypedValue::Number(_)) => Ok(()),
            (kind, other) => Err(format!("expected {}, got {}", kind.id(), other.type_name())),
        }
    }

    fn wrap(self, native: &serde_json::Value) -> TypedValue {
        match self {
            PrimitiveKind::String => TypedValue::String(coerce_string(native)),
            PrimitiveKind::Number => TypedValue::Number(coerce_number(native)),
            PrimitiveKind::Boolean => TypedValue::Boolean(coerce_boolean(native)),
        }
    }
}

/// Extra validation applied to a complex value after its fields have been checked.
pub type ComplexCheck = Arc<dyn Fn(&ValueMap) -> Result<(), String> + Send + Sync>;

/// A named record kind whose fields are themselves value kinds.
#[derive(Clone)]
pub struct ComplexKind {
    name: String,
    fields: BTreeMap<String, ValueKind>,
    check: Option<ComplexCheck>,
}

impl ComplexKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            check: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Attach a record-level check that runs once every field is valid.
    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&ValueMap) -> Result<(), String> + Send + Sync + 'static,
    {
        self.check = Some(Arc::new(check));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &BTreeMap<String, ValueKind> {
        &self.fields
    }

    /// `NAME{field:KIND,...}` over the fields in name order.
    pub fn id(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(field, kind)| format!("{}:{}", field, kind.id()))
            .collect();
        format!("{}{{{}}}", self.name, fields.join(","))
    }

    fn validate(&self, value: &TypedValue) -> Result<(), String> {
        let record = match value {
            TypedValue::Record(record) => record,
            other => return Err(format!("expected {}, got {}", self.name, other.type_name())),
        };

        let mut reasons = Vec::new();
        for (field, kind) in &self.fields {
            match record.get(field) {
                Some(v) => {
                    if let Err(reason) = kind.validate(v) {
                        reasons.push(format!("{}: {}", field, reason));
                    }
                }
                None if kind.is_nullable() => {}
                None => reasons.push(format!("{}: missing value", field)),
            }
        }
        if !reasons.is_empty() {
            return Err(reasons.join("; "));
        }

        match &self.check {
            Some(check) => check(record),
            None => Ok(()),
        }
    }

    fn wrap(&self, native: &serde_json::Value) -> Result<TypedValue, String> {
        let object = native.as_object().ok_or_else(|| {
            format!("expected an object for {}, got {}", self.name, json_type_name(native))
        })?;

        let mut record = ValueMap::new();
        let mut reasons = Vec::new();
        for (field, kind) in &self.fields {
            match object.get(field) {
                Some(v) => match kind.wrap(v) {
                    Ok(wrapped) => {
                        record.insert(field.clone(), wrapped);
                    }
                    Err(reason) => reasons.push(format!("{}: {}", field, reason)),
                },
                None if kind.is_nullable() => {
                    record.insert(field.clone(), TypedValue::Null);
                }
                None => reasons.push(format!("{}: missing value", field)),
            }
        }

        if reasons.is_empty() {
            Ok(TypedValue::Record(record))
        } else {
            Err(reasons.join("; "))
        }
    }

    fn unwrap(&self, value: &TypedValue) -> serde_json::Value {
        let record = match value {
            TypedValue::Record(record) => record,
            other => return other.to_json(),
        };
        let object = self
            .fields
            .iter()
            .filter_map(|(field, kind)| {
                record
                    .get(field)
                    .map(|v| (field.clone(), kind.unwrap(v)))
            })
            .collect();
        serde_json::Value::Object(object)
    }
}

impl fmt::Debug for ComplexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplexKind")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("has_check", &self.check.is_some())
            .finish()
    }
}

/// The kind of a value that can flow through rule wiring.
#[derive(Debug, Clone)]
pub enum ValueKind {
    Primitive(PrimitiveKind),
    Complex(Arc<ComplexKind>),
    Collection(Box<ValueKind>),
    /// Either `null` or a value of the inner kind
    Nullable(Box<ValueKind>),
}

impl ValueKind {
    pub const STRING: ValueKind = ValueKind::Primitive(PrimitiveKind::String);
    pub const NUMBER: ValueKind = ValueKind::Primitive(PrimitiveKind::Number);
    pub const BOOLEAN: ValueKind = ValueKind::Primitive(PrimitiveKind::Boolean);

    pub fn collection_of(entry: ValueKind) -> Self {
        ValueKind::Collection(Box::new(entry))
    }

    pub fn nullable(inner: ValueKind) -> Self {
        ValueKind::Nullable(Box::new(inner))
    }

    pub fn complex(kind: ComplexKind) -> Self {
        ValueKind::Complex(Arc::new(kind))
    }

    /// Stable identifier used for wiring-compatibility checks.
    ///
    /// Collections derive theirs from the entry kind (`NUMBER.COLLECTION`), complex kinds from
    /// their name and fields (`ADDRESS{city:STRING,zip:NUMBER}`).
    pub fn id(&self) -> String {
        match self {
            ValueKind::Primitive(p) => p.id().to_string(),
            ValueKind::Complex(c) => c.id(),
            ValueKind::Collection(entry) => format!("{}{}", entry.id(), COLLECTION_SUFFIX),
            ValueKind::Nullable(inner) => format!("{}{}", inner.id(), NULLABLE_SUFFIX),
        }
    }

    /// Parse an identifier built from primitives and the collection/nullable suffixes.
    ///
    /// Complex kinds cannot be named this way; they only exist in code.
    pub fn from_id(id: &str) -> Option<Self> {
        if let Some(entry) = id.strip_suffix(COLLECTION_SUFFIX) {
            return Self::from_id(entry).map(Self::collection_of);
        }
        if let Some(inner) = id.strip_suffix(NULLABLE_SUFFIX) {
            return Self::from_id(inner).map(Self::nullable);
        }
        match id {
            "STRING" => Some(Self::STRING),
            "NUMBER" => Some(Self::NUMBER),
            "BOOLEAN" => Some(Self::BOOLEAN),
            _ => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueKind::Nullable(_))
    }

    /// BOOLEAN, or a nullable BOOLEAN.
    pub fn is_boolean_like(&self) -> bool {
        match self {
            ValueKind::Primitive(PrimitiveKind::Boolean) => true,
            ValueKind::Nullable(inner) => inner.is_boolean_like(),
            _ => false,
        }
    }

    pub fn validate(&self, value: &TypedValue) -> Result<(), String> {
        match self {
            ValueKind::Primitive(p) => p.validate(value),
            ValueKind::Complex(c) => c.validate(value),
            ValueKind::Collection(entry) => {
                let items = match value {
                    TypedValue::List(items) => items,
                    other => {
                        return Err(format!("expected {}, got {}", self.id(), other.type_name()))
                    }
                };
                let reasons: Vec<String> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| {
                        entry
                            .validate(item)
                            .err()
                            .map(|reason| format!("Invalid entry at index {} ({})", i, reason))
                    })
                    .collect();
                if reasons.is_empty() {
                    Ok(())
                } else {
                    Err(reasons.join("; "))
                }
            }
            ValueKind::Nullable(inner) => match value {
                TypedValue::Null => Ok(()),
                other => inner.validate(other),
            },
        }
    }

    /// Convert a native JSON value into a typed value of this kind.
    ///
    /// Primitives coerce the way dynamic languages do (`"5"` wraps to NUMBER 5, `0` wraps to
    /// BOOLEAN false); a coercion that produces NaN is left for `validate` to reject.
    pub fn wrap(&self, native: &serde_json::Value) -> Result<TypedValue, String> {
        match self {
            ValueKind::Primitive(p) => Ok(p.wrap(native)),
            ValueKind::Complex(c) => c.wrap(native),
            ValueKind::Collection(entry) => {
                let items = native.as_array().ok_or_else(|| {
                    format!("expected a sequence for {}, got {}", self.id(), json_type_name(native))
                })?;
                let mut wrapped = Vec::with_capacity(items.len());
                let mut reasons = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    match entry.wrap(item) {
                        Ok(v) => wrapped.push(v),
                        Err(reason) => {
                            reasons.push(format!("Invalid entry at index {} ({})", i, reason))
                        }
                    }
                }
                if reasons.is_empty() {
                    Ok(TypedValue::List(wrapped))
                } else {
                    Err(reasons.join("; "))
                }
            }
            ValueKind::Nullable(inner) => match native {
                serde_json::Value::Null => Ok(TypedValue::Null),
                other => inner.wrap(other),
            },
        }
    }

    /// Convert a typed value of this kind back into native JSON.
    pub fn unwrap(&self, value: &TypedValue) -> serde_json::Value {
        match (self, value) {
            (ValueKind::Primitive(_), TypedValue::Number(n)) => number_to_json(*n),
            (ValueKind::Primitive(_), other) => other.to_json(),
            (ValueKind::Complex(c), other) => c.unwrap(other),
            (ValueKind::Collection(entry), TypedValue::List(items)) => {
                serde_json::Value::Array(items.iter().map(|item| entry.unwrap(item)).collect())
            }
            (ValueKind::Collection(_), other) => other.to_json(),
            (ValueKind::Nullable(_), TypedValue::Null) => serde_json::Value::Null,
            (ValueKind::Nullable(inner), other) => inner.unwrap(other),
        }
    }

    /// Walk into complex fields along `path` segments.
    pub fn field(&self, path: &[&str]) -> Option<&ValueKind> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            ValueKind::Complex(c) => c.fields.get(*head)?.field(rest),
            ValueKind::Nullable(inner) => inner.field(path),
            _ => None,
        }
    }

    /// Editor-facing description of the kind.
    pub fn describe(&self) -> KindDescriptor {
        match self {
            ValueKind::Primitive(p) => KindDescriptor::Primitive { id: p.id().to_string() },
            ValueKind::Complex(c) => KindDescriptor::Complex {
                id: c.id(),
                fields: c
                    .fields
                    .iter()
                    .map(|(name, kind)| (name.clone(), kind.describe()))
                    .collect(),
            },
            ValueKind::Collection(entry) => KindDescriptor::Collection {
                id: self.id(),
                entry: Box::new(entry.describe()),
            },
            ValueKind::Nullable(inner) => KindDescriptor::Nullable {
                id: self.id(),
                inner: Box::new(inner.describe()),
            },
        }
    }
}

impl PartialEq for ValueKind {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Serializable description of a [`ValueKind`] for external editors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KindDescriptor {
    Primitive {
        id: String,
    },
    Complex {
        id: String,
        fields: BTreeMap<String, KindDescriptor>,
    },
    Collection {
        id: String,
        entry: Box<KindDescriptor>,
    },
    Nullable {
        id: String,
        inner: Box<KindDescriptor>,
    },
}

/// Decides whether a source kind may be wired into a target input of another kind.
pub type CompatibilityFn = fn(&ValueKind, &ValueKind) -> bool;

/// Identifiers are equal, or one kind is the nullable form of the other.
pub fn default_compatibility(source: &ValueKind, target: &ValueKind) -> bool {
    if source.id() == target.id() {
        return true;
    }
    match (source, target) {
        (ValueKind::Nullable(inner), other) | (other, ValueKind::Nullable(inner)) => {
            inner.id() == other.id()
        }
        _ => false,
    }
}

fn json_type_name(native: &serde_json::Value) -> &'static str {
    match native {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn coerce_string(native: &serde_json::Value) -> String {
    match native {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => format_number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::Null => String::new(),
                other => coerce_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        serde_json::Value::Object(_) => "[object Object]".to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

fn coerce_number(native: &serde_json::Value) -> f64 {
    match native {
        serde_json::Value::Null => 0.0,
        serde_json::Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        serde_json::Value::String(s) => parse_numeric_string(s),
        serde_json::Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => parse_numeric_string(&coerce_string(single)),
            _ => f64::NAN,
        },
        serde_json::Value::Object(_) => f64::NAN,
    }
}

fn parse_numeric_string(s: &str) -> f64 {
    let trimmed = s.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed
            .chars()
            .any(|c| c.is_alphabetic() && c != 'e' && c != 'E') =>
        {
            f64::NAN
        }
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

fn coerce_boolean(native: &serde_json::Value) -> bool {
    match native {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => {
            let n = n.as_f64().unwrap_or(f64::NAN);
            n != 0.0 && !n.is_nan()
        }
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}
