// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dispatcher between the JMI interchange shapes.
//!
//! The set of supported `(from, to)` pairs is closed: anything not listed in
//! [`convert_jmi`] fails with [`JmiError::NotImplemented`] before the input
//! is looked at.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::error::{JmiError, Result};
use crate::index::{build_index, RecordIndex};
use crate::record::{json_type_name, records_from_value, Record};
use crate::tree::{build_tree, TreeNode, TreeOptions};

/// The three JMI shapes of a record collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JmiType {
    /// Type 1: flat ordered list.
    List = 1,
    /// Type 2: records keyed by a unique field.
    Map = 2,
    /// Type 3: nested tree.
    Tree = 3,
}

impl JmiType {
    fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::List),
            2 => Some(Self::Map),
            3 => Some(Self::Tree),
            _ => None,
        }
    }
}

impl fmt::Display for JmiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JMI type {}", *self as u8)
    }
}

/// Result of a conversion, serializable back to plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Jmi {
    /// Type 1 output.
    List(Vec<Record>),
    /// Type 2 output.
    Map(RecordIndex),
    /// Type 3 output.
    Tree(TreeNode),
}

impl Jmi {
    /// Which shape this is.
    pub fn jmi_type(&self) -> JmiType {
        match self {
            Self::List(_) => JmiType::List,
            Self::Map(_) => JmiType::Map,
            Self::Tree(_) => JmiType::Tree,
        }
    }

    /// Write as compact JSON. Trees are written without recursion.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn to_writer<W: Write>(&self, writer: W) -> io::Result<()> {
        match self {
            Self::Tree(tree) => tree.to_writer(writer),
            other => serde_json::to_writer(writer, other).map_err(io::Error::from),
        }
    }

    /// Write as indented JSON. Trees are written without recursion.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn to_writer_pretty<W: Write>(&self, writer: W) -> io::Result<()> {
        match self {
            Self::Tree(tree) => tree.to_writer_pretty(writer),
            other => serde_json::to_writer_pretty(writer, other).map_err(io::Error::from),
        }
    }
}

/// Convert `data` from JMI type `from` to JMI type `to`.
///
/// Supported pairs:
/// - 1 → 2: index by `options.key_field`
/// - 1 → 3: nest under `options.parent_field`
/// - 2 → 1: map values in key order
/// - 3 → 1: pre-order flatten
pub fn convert_jmi(from: u8, to: u8, data: Value, options: &TreeOptions) -> Result<Jmi> {
    let pair = (JmiType::from_number(from), JmiType::from_number(to));
    let out = match pair {
        (Some(JmiType::List), Some(JmiType::Map)) => {
            let records = records_from_value(data)?;
            Jmi::Map(build_index(&records, &options.key_field)?)
        }
        (Some(JmiType::List), Some(JmiType::Tree)) => {
            Jmi::Tree(build_tree(records_from_value(data)?, options)?)
        }
        (Some(JmiType::Map), Some(JmiType::List)) => Jmi::List(map_records(data)?),
        (Some(JmiType::Tree), Some(JmiType::List)) => Jmi::List(tree_records(data)?),
        _ => return Err(JmiError::NotImplemented { from, to }),
    };
    tracing::debug!(from, to, "converted JMI data");
    Ok(out)
}

/// Typed front end to [`convert_jmi`] for callers that already hold records.
pub fn convert_records(records: Vec<Record>, to: JmiType, options: &TreeOptions) -> Result<Jmi> {
    match to {
        JmiType::List => Ok(Jmi::List(records)),
        JmiType::Map => Ok(Jmi::Map(build_index(&records, &options.key_field)?)),
        JmiType::Tree => Ok(Jmi::Tree(build_tree(records, options)?)),
    }
}

fn map_records(data: Value) -> Result<Vec<Record>> {
    let Value::Object(map) = data else {
        return Err(JmiError::NotAnObject {
            location: "JMI type 2 data".into(),
            found: json_type_name(&data),
        });
    };
    let mut entries: Vec<(String, Record)> = map
        .into_iter()
        .map(|(key, value)| match value {
            Value::Object(record) => Ok((key, record)),
            other => Err(JmiError::NotAnObject {
                location: format!("[{key:?}]"),
                found: json_type_name(&other),
            }),
        })
        .collect::<Result<_>>()?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries.into_iter().map(|(_, record)| record).collect())
}

/// Flatten a JSON `{element, contains}` tree without building [`TreeNode`]s.
fn tree_records(data: Value) -> Result<Vec<Record>> {
    let mut out = Vec::new();
    let mut stack = vec![(String::from("tree"), data)];
    while let Some((location, node)) = stack.pop() {
        let Value::Object(mut node) = node else {
            return Err(JmiError::NotAnObject {
                location,
                found: json_type_name(&node),
            });
        };
        let element = match node.remove("element") {
            Some(Value::Object(element)) => element,
            Some(other) => {
                return Err(JmiError::NotAnObject {
                    location: format!("{location}.element"),
                    found: json_type_name(&other),
                })
            }
            None => return Err(JmiError::Malformed(format!("{location} has no element"))),
        };
        let contains = match node.remove("contains") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(children)) => children,
            Some(other) => {
                return Err(JmiError::Malformed(format!(
                    "{location}.contains must be an array, found {}",
                    json_type_name(&other)
                )))
            }
        };
        out.push(element);
        for (i, child) in contains.into_iter().enumerate().rev() {
            stack.push((format!("{location}.contains[{i}]"), child));
        }
    }
    Ok(out)
}
