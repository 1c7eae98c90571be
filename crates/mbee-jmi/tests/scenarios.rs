// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::panic)]
use mbee_jmi::{
    build_index, build_tree, convert_jmi, flatten, records_from_value, ElementTree,
    ElementTreeOptions, ErrorKind, FieldPath, Jmi, JmiError, Record, TreeNode, TreeOptions,
};
use serde_json::{json, Value};

fn records(data: Value) -> Vec<Record> {
    records_from_value(data).unwrap()
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r["id"].as_str().unwrap()).collect()
}

fn child_ids(node: &TreeNode) -> Vec<&str> {
    node.contains
        .iter()
        .map(|c| c.element["id"].as_str().unwrap())
        .collect()
}

#[test]
fn root_with_two_children_in_input_order() {
    let tree = build_tree(
        records(json!([
            {"id": "1", "parent": null},
            {"id": "2", "parent": "1"},
            {"id": "3", "parent": "1"}
        ])),
        &TreeOptions::default(),
    )
    .unwrap();
    assert_eq!(tree.element["id"], json!("1"));
    assert_eq!(child_ids(&tree), vec!["2", "3"]);
}

#[test]
fn duplicate_ids_fail_indexing() {
    let err = build_index(
        &records(json!([
            {"id": "1", "parent": null},
            {"id": "1", "parent": null}
        ])),
        &FieldPath::parse("id").unwrap(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert!(err.to_string().contains("\"1\""));
}

#[test]
fn mutual_parents_are_circular() {
    let err = build_tree(
        records(json!([
            {"id": "a", "parent": "b"},
            {"id": "b", "parent": "a"}
        ])),
        &TreeOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularReference);
    assert_eq!(err.status(), 403);
}

#[test]
fn linear_chain_flattens_in_order() {
    let tree = build_tree(
        records(json!([
            {"id": "1", "parent": null},
            {"id": "2", "parent": "1"},
            {"id": "3", "parent": "2"},
            {"id": "4", "parent": "3"}
        ])),
        &TreeOptions::default(),
    )
    .unwrap();
    assert_eq!(ids(&flatten(&tree)), vec!["1", "2", "3", "4"]);
}

#[test]
fn unsupported_conversion_is_501() {
    let err = convert_jmi(1, 4, json!([]), &TreeOptions::default()).unwrap_err();
    assert_eq!(err, JmiError::NotImplemented { from: 1, to: 4 });
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
    assert_eq!(err.status(), 501);
}

#[test]
fn child_before_parent_builds_the_same_tree() {
    let reversed = build_tree(
        records(json!([
            {"id": "2", "parent": "1"},
            {"id": "1", "parent": null}
        ])),
        &TreeOptions::default(),
    )
    .unwrap();
    let ordered = build_tree(
        records(json!([
            {"id": "1", "parent": null},
            {"id": "2", "parent": "1"}
        ])),
        &TreeOptions::default(),
    )
    .unwrap();
    assert_eq!(reversed, ordered);
}

#[test]
fn dangling_parent_never_yields_a_partial_tree() {
    let err = convert_jmi(
        1,
        3,
        json!([
            {"id": "root", "parent": null},
            {"id": "lost", "parent": "nowhere"}
        ]),
        &TreeOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        JmiError::CircularReference {
            unresolved: vec!["lost".into()]
        }
    );
}

#[test]
fn custom_fields_drive_conversion() {
    let options: TreeOptions = serde_json::from_value(json!({
        "key_field": "_id",
        "parent_field": "owner._id"
    }))
    .unwrap();
    let out = convert_jmi(
        1,
        3,
        json!([
            {"_id": "b", "owner": {"_id": "a"}},
            {"_id": "a", "owner": null}
        ]),
        &options,
    )
    .unwrap();
    let Jmi::Tree(tree) = out else {
        panic!("expected a tree");
    };
    assert_eq!(tree.element["_id"], json!("a"));
    assert_eq!(tree.contains[0].element["_id"], json!("b"));
}

#[test]
fn element_export_order() {
    let tree = ElementTree::build(
        records(json!([
            {"id": "diagram", "parent": "views", "type": "Diagram"},
            {"id": "views", "parent": "model", "type": "Package"},
            {"id": "model", "parent": null, "type": "Package"},
            {"id": "req-1", "parent": "model", "type": "Requirement"}
        ])),
        &ElementTreeOptions::default(),
    )
    .unwrap();
    assert_eq!(
        ids(&tree.flatten()),
        vec!["model", "views", "diagram", "req-1"]
    );
    let outline: Vec<String> = tree
        .iter()
        .map(|(depth, r)| format!("{}{}", "  ".repeat(depth), r["id"].as_str().unwrap()))
        .collect();
    assert_eq!(outline, vec!["model", "  views", "    diagram", "  req-1"]);
}

#[test]
fn three_to_one_undoes_one_to_three() {
    let data = json!([
        {"id": "1", "parent": null},
        {"id": "3", "parent": "2"},
        {"id": "2", "parent": "1"}
    ]);
    let tree = convert_jmi(1, 3, data, &TreeOptions::default()).unwrap();
    let back = convert_jmi(3, 1, serde_json::to_value(&tree).unwrap(), &TreeOptions::default())
        .unwrap();
    let Jmi::List(list) = back else {
        panic!("expected a list");
    };
    assert_eq!(ids(&list), vec!["1", "2", "3"]);
}
