// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record shape and the dotted field-path convention.
//!
//! A record is a plain JSON object. The core only reads three things from it
//! (key, parent reference, type), each addressed by a [`FieldPath`]; all
//! other fields are carried through untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{JmiError, Result};

/// A single model record: an arbitrary JSON object.
pub type Record = Map<String, Value>;

/// Record type that may contain other records in an element tree.
pub const PACKAGE_TYPE: &str = "package";

/// Dotted path to a (possibly nested) field, e.g. `custom.externalId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path. Empty paths and empty segments are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let segments: Vec<String> = raw.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(JmiError::InvalidFieldPath { path: raw.into() });
        }
        Ok(Self {
            raw: raw.to_owned(),
            segments,
        })
    }

    /// A single-segment path. `name` must not contain `.` or be empty.
    pub(crate) fn single(name: &str) -> Self {
        Self {
            raw: name.to_owned(),
            segments: vec![name.to_owned()],
        }
    }

    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Resolve the path against a record.
    pub fn lookup<'r>(&self, record: &'r Record) -> Option<&'r Value> {
        let (first, rest) = self.segments.split_first()?;
        let mut value = record.get(first)?;
        for segment in rest {
            value = value.as_object()?.get(segment)?;
        }
        Some(value)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = JmiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = JmiError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

/// Name of a JSON value's type, for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read the key of the record at `position`.
///
/// Strings are used as-is, numbers by their JSON text. Anything else,
/// including a missing field, is a data format error.
pub fn key_of(record: &Record, path: &FieldPath, position: usize) -> Result<String> {
    let value = path.lookup(record).ok_or_else(|| JmiError::MissingField {
        position,
        field: path.to_string(),
    })?;
    scalar_text(value).ok_or_else(|| JmiError::InvalidFieldValue {
        position,
        field: path.to_string(),
        found: json_type_name(value),
    })
}

/// Read the parent reference of the record at `position`.
///
/// An absent field or JSON `null` marks a root candidate.
pub fn parent_of(record: &Record, path: &FieldPath, position: usize) -> Result<Option<String>> {
    match path.lookup(record) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_text(value)
            .map(Some)
            .ok_or_else(|| JmiError::InvalidFieldValue {
                position,
                field: path.to_string(),
                found: json_type_name(value),
            }),
    }
}

/// Read the type discriminator, if it is a string.
pub fn type_of<'r>(record: &'r Record, path: &FieldPath) -> Option<&'r str> {
    path.lookup(record).and_then(Value::as_str)
}

/// Whether the record may contain children in an element tree.
pub fn is_package(record: &Record, path: &FieldPath) -> bool {
    type_of(record, path).is_some_and(|t| t.eq_ignore_ascii_case(PACKAGE_TYPE))
}

/// Unpack JMI type 1 data: a JSON array whose items are all objects.
pub fn records_from_value(data: Value) -> Result<Vec<Record>> {
    let Value::Array(items) = data else {
        return Err(JmiError::NotAList {
            found: json_type_name(&data),
        });
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(JmiError::NotAnObject {
                location: format!("records[{i}]"),
                found: json_type_name(&other),
            }),
        })
        .collect()
}
