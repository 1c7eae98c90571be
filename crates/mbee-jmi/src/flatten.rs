// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Depth-first, pre-order flattening of JMI type 3 trees.
//!
//! A parent is always emitted before its descendants and siblings stay
//! contiguous under their parent, in attachment order.

use crate::record::Record;
use crate::tree::TreeNode;

/// Lazy pre-order walk over a [`TreeNode`], yielding `(depth, record)`.
///
/// The root has depth 0. Walking borrows the tree, so a new walk can be
/// started at any time.
#[derive(Debug, Clone)]
pub struct PreOrder<'a> {
    stack: Vec<(usize, &'a TreeNode)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a Record);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.contains.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, &node.element))
    }
}

impl TreeNode {
    /// Pre-order walk of this subtree.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: vec![(0, self)],
        }
    }

    /// Consume the tree, returning its records in pre-order.
    pub fn into_records(mut self) -> Vec<Record> {
        let mut out = Vec::new();
        let mut stack = vec![std::mem::take(&mut self.contains)];
        out.push(std::mem::take(&mut self.element));
        // Each stack entry holds the not-yet-visited siblings, reversed.
        if let Some(top) = stack.last_mut() {
            top.reverse();
        }
        while let Some(siblings) = stack.last_mut() {
            let Some(mut node) = siblings.pop() else {
                stack.pop();
                continue;
            };
            out.push(std::mem::take(&mut node.element));
            let mut children = std::mem::take(&mut node.contains);
            children.reverse();
            stack.push(children);
        }
        out
    }
}

impl<'a> IntoIterator for &'a TreeNode {
    type Item = (usize, &'a Record);
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Records of `tree` in pre-order.
pub fn flatten(tree: &TreeNode) -> Vec<Record> {
    tree.iter().map(|(_, record)| record.clone()).collect()
}
