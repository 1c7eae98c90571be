// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JMI type 3: records nested under their parents.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::assemble::{Linkage, RootPolicy};
use crate::error::Result;
use crate::record::{FieldPath, Record};

/// One record and the records it contains (JMI type 3).
///
/// The derived `Serialize`, `Deserialize`, `Clone`, `Debug` and `PartialEq`
/// impls recurse once per level. Use [`TreeNode::to_writer`] to emit trees of
/// unbounded depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// The record itself.
    pub element: Record,
    /// Contained records, in the order they were attached.
    #[serde(default)]
    pub contains: Vec<TreeNode>,
}

impl TreeNode {
    /// A node with no children.
    pub fn leaf(element: Record) -> Self {
        Self {
            element,
            contains: Vec::new(),
        }
    }

    /// Total number of records in this subtree.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Always false: a node holds at least its own record.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Write this tree as compact JSON, identical to `serde_json::to_writer`.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn to_writer<W: Write>(&self, writer: W) -> io::Result<()> {
        write_tree(self, writer, false)
    }

    /// Write this tree as indented JSON, identical to
    /// `serde_json::to_writer_pretty`.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn to_writer_pretty<W: Write>(&self, writer: W) -> io::Result<()> {
        write_tree(self, writer, true)
    }
}

enum Step<'a> {
    Open(&'a TreeNode, usize),
    Item { depth: usize, first: bool },
    Close(usize),
}

struct Layout {
    pretty: bool,
}

impl Layout {
    fn line<W: Write>(&self, out: &mut W, depth: usize) -> io::Result<()> {
        if self.pretty {
            out.write_all(b"\n")?;
            for _ in 0..depth {
                out.write_all(b"  ")?;
            }
        }
        Ok(())
    }

    fn key<W: Write>(&self, out: &mut W, depth: usize, key: &[u8]) -> io::Result<()> {
        self.line(out, depth)?;
        out.write_all(key)?;
        let colon: &[u8] = if self.pretty { b": " } else { b":" };
        out.write_all(colon)
    }

    fn record<W: Write>(&self, out: &mut W, depth: usize, record: &Record) -> io::Result<()> {
        if !self.pretty {
            return serde_json::to_writer(&mut *out, record).map_err(io::Error::from);
        }
        // Re-indent the record's own lines; JSON strings never hold a raw newline.
        let text = serde_json::to_vec_pretty(record).map_err(io::Error::from)?;
        for (i, line) in text.split(|&b| b == b'\n').enumerate() {
            if i > 0 {
                self.line(out, depth)?;
            }
            out.write_all(line)?;
        }
        Ok(())
    }
}

fn write_tree<W: Write>(root: &TreeNode, mut out: W, pretty: bool) -> io::Result<()> {
    let layout = Layout { pretty };
    let mut stack = vec![Step::Open(root, 0)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Open(node, depth) => {
                out.write_all(b"{")?;
                layout.key(&mut out, depth + 1, b"\"element\"")?;
                layout.record(&mut out, depth + 1, &node.element)?;
                out.write_all(b",")?;
                layout.key(&mut out, depth + 1, b"\"contains\"")?;
                if node.contains.is_empty() {
                    out.write_all(b"[]")?;
                    layout.line(&mut out, depth)?;
                    out.write_all(b"}")?;
                    continue;
                }
                out.write_all(b"[")?;
                stack.push(Step::Close(depth));
                for (i, child) in node.contains.iter().enumerate().rev() {
                    stack.push(Step::Open(child, depth + 2));
                    stack.push(Step::Item {
                        depth: depth + 2,
                        first: i == 0,
                    });
                }
            }
            Step::Item { depth, first } => {
                if !first {
                    out.write_all(b",")?;
                }
                layout.line(&mut out, depth)?;
            }
            Step::Close(depth) => {
                layout.line(&mut out, depth + 1)?;
                out.write_all(b"]")?;
                layout.line(&mut out, depth)?;
                out.write_all(b"}")?;
            }
        }
    }
    out.flush()
}

// Nested `Vec<TreeNode>` would otherwise drop recursively.
impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.contains);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.contains);
        }
    }
}

/// Field names and policies for tree assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Field holding each record's unique key.
    pub key_field: FieldPath,
    /// Field holding the parent's key (`null`/absent for roots).
    pub parent_field: FieldPath,
    /// Behaviour when several roots exist.
    pub roots: RootPolicy,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            key_field: default_path("id"),
            parent_field: default_path("parent"),
            roots: RootPolicy::default(),
        }
    }
}

pub(crate) fn default_path(name: &'static str) -> FieldPath {
    FieldPath::single(name)
}

/// Build the single rooted tree for `records`.
///
/// Duplicate keys, dangling parents, cycles and (per
/// [`TreeOptions::roots`]) multiple roots are errors; no partial tree is
/// ever returned.
pub fn build_tree(records: Vec<Record>, options: &TreeOptions) -> Result<TreeNode> {
    let linkage = Linkage::build(&records, &options.key_field, &options.parent_field, None)?;
    let root = linkage.select_root(options.roots)?;
    let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();
    let mut built = empty_nodes(slots.len());
    let tree = materialize(&linkage, &mut slots, &mut built, root);
    tracing::debug!(root = %linkage.keys[root], "built JMI tree");
    Ok(tree)
}

/// Build one tree per root, roots in input order.
///
/// Same checks as [`build_tree`] except that any number of roots (including
/// none, for empty input) is accepted.
pub fn build_forest(records: Vec<Record>, options: &TreeOptions) -> Result<Vec<TreeNode>> {
    let linkage = Linkage::build(&records, &options.key_field, &options.parent_field, None)?;
    let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();
    let mut built = empty_nodes(slots.len());
    Ok(linkage
        .roots
        .iter()
        .map(|&root| materialize(&linkage, &mut slots, &mut built, root))
        .collect())
}

fn empty_nodes(n: usize) -> Vec<Option<TreeNode>> {
    let mut built = Vec::new();
    built.resize_with(n, || None);
    built
}

/// Turn the linked subtree at `root` into nested nodes.
///
/// Nodes are built in reverse pre-order so every child exists before its
/// parent claims it. `built` is scratch space shared across the roots of a
/// forest; every slot it fills is taken again before returning.
fn materialize(
    linkage: &Linkage,
    slots: &mut [Option<Record>],
    built: &mut [Option<TreeNode>],
    root: usize,
) -> TreeNode {
    let order = linkage.preorder(root);
    for &node in order.iter().rev() {
        let contains = linkage.children[node]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[node] = Some(TreeNode {
            element: slots[node].take().unwrap_or_default(),
            contains,
        });
    }
    built[root]
        .take()
        .unwrap_or_else(|| unreachable!("root is the last node materialized"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::JmiError;
    use crate::record::records_from_value;
    use serde_json::json;

    fn ids(node: &TreeNode) -> Vec<&str> {
        node.contains
            .iter()
            .map(|c| c.element["id"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn builds_root_with_children_in_order() {
        let records = records_from_value(json!([
            {"id": "1", "parent": null},
            {"id": "2", "parent": "1"},
            {"id": "3", "parent": "1"}
        ]))
        .unwrap();
        let tree = build_tree(records, &TreeOptions::default()).unwrap();
        assert_eq!(tree.element["id"], json!("1"));
        assert_eq!(ids(&tree), vec!["2", "3"]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn parent_after_child_is_supported() {
        let records = records_from_value(json!([
            {"id": "2", "parent": "1"},
            {"id": "1", "parent": null}
        ]))
        .unwrap();
        let tree = build_tree(records, &TreeOptions::default()).unwrap();
        assert_eq!(tree.element["id"], json!("1"));
        assert_eq!(ids(&tree), vec!["2"]);
    }

    #[test]
    fn two_node_cycle_is_rejected() {
        let records = records_from_value(json!([
            {"id": "a", "parent": "b"},
            {"id": "b", "parent": "a"}
        ]))
        .unwrap();
        let err = build_tree(records, &TreeOptions::default()).unwrap_err();
        assert_eq!(
            err,
            JmiError::CircularReference {
                unresolved: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn empty_input_has_no_root() {
        assert_eq!(
            build_tree(Vec::new(), &TreeOptions::default()),
            Err(JmiError::NoRoot)
        );
        assert!(build_forest(Vec::new(), &TreeOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn last_wins_discards_earlier_roots() {
        let records = records_from_value(json!([
            {"id": "a", "parent": null},
            {"id": "a1", "parent": "a"},
            {"id": "b", "parent": null}
        ]))
        .unwrap();
        let options = TreeOptions {
            roots: RootPolicy::LastWins,
            ..TreeOptions::default()
        };
        let tree = build_tree(records, &options).unwrap();
        assert_eq!(tree.element["id"], json!("b"));
        assert!(tree.contains.is_empty());
    }

    #[test]
    fn forest_keeps_every_root() {
        let records = records_from_value(json!([
            {"id": "a", "parent": null},
            {"id": "b", "parent": null},
            {"id": "b1", "parent": "b"}
        ]))
        .unwrap();
        let forest = build_forest(records, &TreeOptions::default()).unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[1].element["id"], json!("b"));
        assert_eq!(ids(&forest[1]), vec!["b1"]);
    }

    #[test]
    fn forest_of_many_roots() {
        let records: Vec<Record> = (0..40_000)
            .map(|i| {
                records_from_value(json!([{"id": i.to_string(), "parent": null}]))
                    .unwrap()
                    .remove(0)
            })
            .collect();
        let forest = build_forest(records, &TreeOptions::default()).unwrap();
        assert_eq!(forest.len(), 40_000);
        assert_eq!(forest[39_999].element["id"], json!("39999"));
        assert!(forest.iter().all(|t| t.contains.is_empty()));
    }

    #[test]
    fn writers_match_serde_json_output() {
        let records = records_from_value(json!([
            {"id": "1", "parent": null, "tags": ["a", {"k": 1}], "meta": {}},
            {"id": "2", "parent": "1"},
            {"id": "3", "parent": "2", "note": "line\nbreak"},
            {"id": "4", "parent": "1"}
        ]))
        .unwrap();
        let tree = build_tree(records, &TreeOptions::default()).unwrap();

        let mut compact = Vec::new();
        tree.to_writer(&mut compact).unwrap();
        assert_eq!(compact, serde_json::to_vec(&tree).unwrap());

        let mut pretty = Vec::new();
        tree.to_writer_pretty(&mut pretty).unwrap();
        assert_eq!(
            String::from_utf8(pretty).unwrap(),
            serde_json::to_string_pretty(&tree).unwrap()
        );

        let leaf = TreeNode::leaf(records_from_value(json!([{}])).unwrap().remove(0));
        let mut out = Vec::new();
        leaf.to_writer_pretty(&mut out).unwrap();
        assert_eq!(out, serde_json::to_vec_pretty(&leaf).unwrap());
    }

    #[test]
    fn serializes_as_element_and_contains() {
        let records = records_from_value(json!([
            {"id": "1", "parent": null},
            {"id": "2", "parent": "1"}
        ]))
        .unwrap();
        let tree = build_tree(records, &TreeOptions::default()).unwrap();
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({
                "element": {"id": "1", "parent": null},
                "contains": [{"element": {"id": "2", "parent": "1"}, "contains": []}]
            })
        );
    }

    #[test]
    fn deep_chains_build_and_drop_without_recursion() {
        let records: Vec<Record> = (0..100_000)
            .map(|i| {
                let parent = if i == 0 {
                    serde_json::Value::Null
                } else {
                    json!((i - 1).to_string())
                };
                records_from_value(json!([{"id": i.to_string(), "parent": parent}]))
                    .unwrap()
                    .remove(0)
            })
            .collect();
        let tree = build_tree(records, &TreeOptions::default()).unwrap();
        assert_eq!(tree.len(), 100_000);
        let mut out = Vec::new();
        tree.to_writer(&mut out).unwrap();
        assert!(out.starts_with(br#"{"element":{"id":"0","parent":null},"contains":[{"#));
        assert!(out.ends_with(b"[]}]}"));
        drop(tree);
    }
}
