// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Element trees: model elements arranged under their packages.
//!
//! Unlike the generic JMI type 3 tree, only records whose type is
//! `package` (any case) may contain other records. The tree is kept as a
//! flat node table with child index lists, root at slot 0, and is mainly
//! used to produce a canonical display/export order.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::assemble::{Linkage, NonPackagePolicy, PackageRule};
use crate::error::Result;
use crate::record::{scalar_text, FieldPath, Record};
use crate::tree::{default_path, TreeNode, TreeOptions};

/// Options for [`ElementTree::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementTreeOptions {
    /// Key/parent fields and root policy.
    #[serde(flatten)]
    pub tree: TreeOptions,
    /// Field holding the element type.
    pub type_field: FieldPath,
    /// Behaviour when a record is contained by a non-package.
    pub non_package: NonPackagePolicy,
}

impl Default for ElementTreeOptions {
    fn default() -> Self {
        Self {
            tree: TreeOptions::default(),
            type_field: default_path("type"),
            non_package: NonPackagePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ElementNode {
    key: String,
    record: Record,
    children: Vec<usize>,
}

/// An element hierarchy stored as a node table.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementTree {
    nodes: Vec<ElementNode>,
    slots: HashMap<String, usize>,
}

const ROOT: usize = 0;

impl ElementTree {
    /// Assemble the element tree for `records`.
    ///
    /// Fails on duplicate keys, dangling or circular parent chains, a
    /// disallowed number of roots, and (unless
    /// [`NonPackagePolicy::Drop`] is set) on records contained by a
    /// non-package.
    pub fn build(records: Vec<Record>, options: &ElementTreeOptions) -> Result<Self> {
        let rule = PackageRule {
            type_field: &options.type_field,
            policy: options.non_package,
        };
        let mut linkage = Linkage::build(
            &records,
            &options.tree.key_field,
            &options.tree.parent_field,
            Some(&rule),
        )?;
        let root = linkage.select_root(options.tree.roots)?;
        let order = linkage.preorder(root);

        let mut slot_of = vec![usize::MAX; records.len()];
        for (slot, &old) in order.iter().enumerate() {
            slot_of[old] = slot;
        }
        let mut records: Vec<Option<Record>> = records.into_iter().map(Some).collect();
        let mut nodes = Vec::with_capacity(order.len());
        let mut slots = HashMap::with_capacity(order.len());
        for (slot, &old) in order.iter().enumerate() {
            let key = std::mem::take(&mut linkage.keys[old]);
            slots.insert(key.clone(), slot);
            nodes.push(ElementNode {
                key,
                record: records[old].take().unwrap_or_default(),
                children: linkage.children[old].iter().map(|&c| slot_of[c]).collect(),
            });
        }
        tracing::debug!(elements = nodes.len(), "built element tree");
        Ok(Self { nodes, slots })
    }

    /// The root element.
    pub fn root(&self) -> &Record {
        &self.nodes[ROOT].record
    }

    /// Key of the root element.
    pub fn root_key(&self) -> &str {
        &self.nodes[ROOT].key
    }

    /// Number of elements in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no elements.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up an element by key.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.slots.get(key).map(|&slot| &self.nodes[slot].record)
    }

    /// Direct children of `key`, in order. `None` if `key` is not in the tree.
    pub fn children(&self, key: &str) -> Option<impl Iterator<Item = &Record> + '_> {
        let slot = *self.slots.get(key)?;
        Some(
            self.nodes[slot]
                .children
                .iter()
                .map(|&c| &self.nodes[c].record),
        )
    }

    /// Lazy pre-order walk yielding `(depth, record)`.
    pub fn iter(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![(0, ROOT)],
        }
    }

    /// Pre-order walk yielding `(depth, key)`.
    pub fn keys(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.walk_slots()
            .map(|(depth, slot)| (depth, self.nodes[slot].key.as_str()))
    }

    /// Records in pre-order.
    pub fn flatten(&self) -> Vec<Record> {
        self.iter().map(|(_, record)| record.clone()).collect()
    }

    /// Consume the tree, returning its records in pre-order.
    pub fn into_records(mut self) -> Vec<Record> {
        let order: Vec<usize> = self.walk_slots().map(|(_, slot)| slot).collect();
        order
            .into_iter()
            .map(|slot| std::mem::take(&mut self.nodes[slot].record))
            .collect()
    }

    /// Stably reorder every sibling list by the text of `field`.
    ///
    /// Strings compare as-is and numbers by their JSON text; elements
    /// without the field keep their relative order after those with it.
    pub fn sort_children_by(&mut self, field: &FieldPath) {
        for slot in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[slot].children);
            children.sort_by(|&a, &b| {
                let ka = field.lookup(&self.nodes[a].record).and_then(scalar_text);
                let kb = field.lookup(&self.nodes[b].record).and_then(scalar_text);
                match (ka, kb) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
            self.nodes[slot].children = children;
        }
    }

    /// Nested JMI type 3 view of this tree.
    pub fn to_tree_node(&self) -> TreeNode {
        let order: Vec<usize> = self.walk_slots().map(|(_, slot)| slot).collect();
        let mut built: Vec<Option<TreeNode>> = Vec::new();
        built.resize_with(self.nodes.len(), || None);
        for &slot in order.iter().rev() {
            let node = &self.nodes[slot];
            let contains = node
                .children
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[slot] = Some(TreeNode {
                element: node.record.clone(),
                contains,
            });
        }
        built[ROOT]
            .take()
            .unwrap_or_else(|| unreachable!("root is the last node materialized"))
    }

    fn walk_slots(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let mut stack = vec![(0, ROOT)];
        std::iter::from_fn(move || {
            let (depth, slot) = stack.pop()?;
            stack.extend(
                self.nodes[slot]
                    .children
                    .iter()
                    .rev()
                    .map(|&c| (depth + 1, c)),
            );
            Some((depth, slot))
        })
    }
}

/// Pre-order walk over an [`ElementTree`]; see [`ElementTree::iter`].
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    tree: &'a ElementTree,
    stack: Vec<(usize, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Record);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, slot) = self.stack.pop()?;
        let node = &self.tree.nodes[slot];
        self.stack
            .extend(node.children.iter().rev().map(|&c| (depth + 1, c)));
        Some((depth, &node.record))
    }
}

impl<'a> IntoIterator for &'a ElementTree {
    type Item = (usize, &'a Record);
    type IntoIter = Walk<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
