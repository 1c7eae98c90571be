// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Parent/child linking over a flat node table.
//!
//! Records stay where they are in the input; links are kept as index lists
//! (`children[i]` holds the positions of record `i`'s children in input
//! order). Every walk uses an explicit stack.

use serde::{Deserialize, Serialize};

use crate::error::{JmiError, Result};
use crate::index::KeyTable;
use crate::record::{is_package, parent_of, type_of, FieldPath, Record};

/// What to do when more than one record has no parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootPolicy {
    /// Fail with [`JmiError::MultipleRoots`].
    #[default]
    Reject,
    /// Keep the first root in input order; other root subtrees are discarded.
    FirstWins,
    /// Keep the last root in input order; other root subtrees are discarded.
    LastWins,
}

/// What to do when a record names a non-package record as its parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonPackagePolicy {
    /// Fail with [`JmiError::NonPackageParent`].
    #[default]
    Reject,
    /// Drop the offending record and its subtree.
    Drop,
}

pub(crate) struct PackageRule<'a> {
    pub(crate) type_field: &'a FieldPath,
    pub(crate) policy: NonPackagePolicy,
}

/// Parent/child links for one input, validated.
pub(crate) struct Linkage {
    pub(crate) keys: Vec<String>,
    pub(crate) children: Vec<Vec<usize>>,
    pub(crate) roots: Vec<usize>,
}

impl Linkage {
    /// Link `records` under their parents and check that every record is
    /// reachable from some root (or was explicitly dropped).
    pub(crate) fn build(
        records: &[Record],
        key_field: &FieldPath,
        parent_field: &FieldPath,
        package_rule: Option<&PackageRule<'_>>,
    ) -> Result<Self> {
        let KeyTable { keys, positions } = KeyTable::build(records, key_field)?;
        let n = records.len();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut roots = Vec::new();
        let mut dropped = Vec::new();

        for (i, record) in records.iter().enumerate() {
            let Some(parent_key) = parent_of(record, parent_field, i)? else {
                roots.push(i);
                continue;
            };
            // Dangling parents stay unlinked and are reported below.
            let Some(&p) = positions.get(&parent_key) else {
                continue;
            };
            if let Some(rule) = package_rule {
                if !is_package(&records[p], rule.type_field) {
                    match rule.policy {
                        NonPackagePolicy::Reject => {
                            return Err(JmiError::NonPackageParent {
                                child: keys[i].clone(),
                                parent: parent_key,
                                parent_type: type_of(&records[p], rule.type_field)
                                    .unwrap_or_default()
                                    .to_owned(),
                            });
                        }
                        NonPackagePolicy::Drop => {
                            tracing::warn!(
                                child = %keys[i],
                                parent = %parent_key,
                                "dropping record contained by a non-package parent"
                            );
                            dropped.push(i);
                            continue;
                        }
                    }
                }
            }
            children[p].push(i);
        }

        let mut seen = vec![false; n];
        for &start in roots.iter().chain(&dropped) {
            for node in preorder(&children, start) {
                seen[node] = true;
            }
        }
        let unresolved: Vec<String> = seen
            .iter()
            .zip(&keys)
            .filter(|(reached, _)| !**reached)
            .map(|(_, key)| key.clone())
            .collect();
        if !unresolved.is_empty() {
            return Err(JmiError::CircularReference { unresolved });
        }
        if !dropped.is_empty() {
            tracing::warn!(dropped = dropped.len(), "records dropped by the package rule");
        }

        Ok(Self {
            keys,
            children,
            roots,
        })
    }

    /// Pick the single root allowed by `policy`.
    pub(crate) fn select_root(&self, policy: RootPolicy) -> Result<usize> {
        match (self.roots.as_slice(), policy) {
            ([], _) => Err(JmiError::NoRoot),
            ([only], _) => Ok(*only),
            (_, RootPolicy::Reject) => Err(JmiError::MultipleRoots {
                roots: self.roots.iter().map(|&r| self.keys[r].clone()).collect(),
            }),
            ([first, .., last], _) => {
                let kept = if policy == RootPolicy::FirstWins {
                    *first
                } else {
                    *last
                };
                tracing::warn!(
                    roots = self.roots.len(),
                    kept = %self.keys[kept],
                    "multiple roots found; discarding all but one"
                );
                Ok(kept)
            }
        }
    }

    /// Positions of `root`'s subtree in pre-order.
    pub(crate) fn preorder(&self, root: usize) -> Vec<usize> {
        preorder(&self.children, root)
    }
}

/// Pre-order walk over index links; children are visited in list order.
pub(crate) fn preorder(children: &[Vec<usize>], root: usize) -> Vec<usize> {
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        order.push(node);
        stack.extend(children[node].iter().rev().copied());
    }
    order
}
