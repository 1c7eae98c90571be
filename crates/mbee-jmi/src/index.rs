// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JMI type 2: records indexed by a unique key.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{JmiError, Result};
use crate::record::{key_of, FieldPath, Record};

/// Records keyed by a caller-chosen field (JMI type 2).
///
/// Iteration and serialization follow key order, never input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordIndex {
    entries: BTreeMap<String, Record>,
}

impl RecordIndex {
    /// Look up a record by key.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.entries.get(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(key, record)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Unwrap into the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, Record> {
        self.entries
    }

    /// Records in ascending key order (JMI type 2 back to type 1).
    pub fn into_records(self) -> Vec<Record> {
        self.entries.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a RecordIndex {
    type Item = (&'a String, &'a Record);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Keys of every record plus a key → position table.
///
/// Shared by the index and tree builders so both surface duplicate keys the
/// same way, in input order.
pub(crate) struct KeyTable {
    pub(crate) keys: Vec<String>,
    pub(crate) positions: HashMap<String, usize>,
}

impl KeyTable {
    pub(crate) fn build(records: &[Record], key_field: &FieldPath) -> Result<Self> {
        let mut keys = Vec::with_capacity(records.len());
        let mut positions = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let key = key_of(record, key_field, position)?;
            if positions.insert(key.clone(), position).is_some() {
                return Err(JmiError::DuplicateKey { key });
            }
            keys.push(key);
        }
        Ok(Self { keys, positions })
    }
}

/// Build a JMI type 2 index from JMI type 1 records.
///
/// Fails with [`JmiError::DuplicateKey`] on the first repeated key; the
/// input is never partially indexed.
pub fn build_index(records: &[Record], key_field: &FieldPath) -> Result<RecordIndex> {
    let table = KeyTable::build(records, key_field)?;
    let entries = table.keys.into_iter().zip(records.iter().cloned()).collect();
    tracing::debug!(records = records.len(), key_field = %key_field, "built JMI index");
    Ok(RecordIndex { entries })
}
