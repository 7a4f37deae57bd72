//! Tests for TreeBuilder: desired tree from rows, observed tree from persisted nodes

use std::collections::BTreeSet;
use std::sync::Arc;

use rstest::{fixture, rstest};

use coasync::domain::{
    GroupKey, PathSeparator, PathTree, PersistedTreeNode, RawRow, SelectorRangeParser,
    TreeBuilder, TreeNodeKey,
};

#[fixture]
fn builder() -> TreeBuilder {
    TreeBuilder::new(PathSeparator::default(), Arc::new(SelectorRangeParser))
}

fn labels_below(tree: &PathTree, path: &[&str]) -> Vec<String> {
    let mut idx = tree.root();
    for segment in path {
        idx = tree.find_child(idx, segment).expect("path exists");
    }
    tree.children(idx)
        .iter()
        .filter_map(|&c| tree.node(c).and_then(|n| n.label.clone()))
        .collect()
}

// ============================================================
// Desired tree
// ============================================================

#[rstest]
fn given_rows_when_building_then_groups_share_prefix_nodes(builder: TreeBuilder) {
    let rows = vec![
        RawRow::new("1000", "Assets - Current", "Cash"),
        RawRow::new("1100", "Assets - Current", "Bank"),
        RawRow::new("2000", "Assets - Fixed", "Building"),
    ];

    let (records, tree) = builder.from_rows(&rows);

    assert_eq!(records.len(), 3);
    assert_eq!(tree.len(), 4);
    assert_eq!(labels_below(&tree, &[]), vec!["Assets"]);
    assert_eq!(labels_below(&tree, &["Assets"]), vec!["Current", "Fixed"]);

    let assets = tree.find_child(tree.root(), "Assets").expect("Assets");
    let current = tree.find_child(assets, "Current").expect("Current");
    let fixed = tree.find_child(assets, "Fixed").expect("Fixed");
    assert_eq!(tree.node(current).expect("node").leaves, vec![0, 1]);
    assert_eq!(tree.node(fixed).expect("node").leaves, vec![2]);
    assert!(tree.node(assets).expect("node").leaves.is_empty());
}

#[rstest]
fn given_invalid_rows_when_building_then_skips_them_silently(builder: TreeBuilder) {
    let rows = vec![
        RawRow::new("ID", "Group", "Name"),
        RawRow::new("1000", "Assets", "Cash"),
        RawRow::new("", "Assets", "No id"),
        RawRow::new("1200", "", "No group"),
        RawRow::new("1300", "Assets", ""),
        RawRow::new("NaN", "Assets", "Not a number"),
        RawRow::default(),
    ];

    let (records, tree) = builder.from_rows(&rows);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "1000");
    assert_eq!(tree.len(), 2);
}

#[rstest]
#[case::decimal("1000.5")]
#[case::exponent("1e3")]
#[case::negative("-42")]
fn given_numeric_id_when_building_then_accepts_row(builder: TreeBuilder, #[case] id: &str) {
    let rows = vec![RawRow::new(id, "Assets", "Petty cash")];

    let (records, _) = builder.from_rows(&rows);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
}

#[rstest]
#[case::short_infinity("inf")]
#[case::long_infinity("infinity")]
#[case::signed_infinity("-Infinity")]
#[case::not_a_number("NaN")]
#[case::word("Id")]
#[case::hex("0x10")]
fn given_non_finite_or_textual_id_when_building_then_skips_row(
    builder: TreeBuilder,
    #[case] id: &str,
) {
    let rows = vec![RawRow::new(id, "Assets", "Cash")];

    let (records, tree) = builder.from_rows(&rows);

    assert!(records.is_empty(), "id {:?} should be rejected", id);
    assert!(tree.is_empty());
}

#[rstest]
fn given_range_cells_when_building_then_records_carry_query(builder: TreeBuilder) {
    let rows = vec![
        RawRow::new("1000", "Assets", "Cash").with_ranges("Cash 10000 to 19999 (15000)", ""),
        RawRow::new("1100", "Assets", "Bank"),
    ];

    let (records, _) = builder.from_rows(&rows);

    assert_eq!(records[0].range_expression, "pa=10000to19999&exclude=15000");
    assert_eq!(records[1].range_expression, "");
}

#[rstest]
fn given_untrimmed_segments_when_building_then_trims_labels(builder: TreeBuilder) {
    let rows = vec![RawRow::new("1000", "Income -Sales -  Online", "Shop")];

    let (_, tree) = builder.from_rows(&rows);

    assert_eq!(labels_below(&tree, &["Income", "Sales"]), vec!["Online"]);
}

#[test]
fn given_custom_separator_when_building_then_splits_on_it() {
    let builder = TreeBuilder::new(
        PathSeparator::new("/").expect("separator"),
        Arc::new(SelectorRangeParser),
    );
    let rows = vec![RawRow::new("1000", "Income/Sales - EU", "Shop")];

    let (_, tree) = builder.from_rows(&rows);

    assert_eq!(labels_below(&tree, &["Income"]), vec!["Sales - EU"]);
    assert_eq!(builder.separator().join(&["Income", "Sales"]), "Income / Sales");
}

// ============================================================
// Observed tree
// ============================================================

fn persisted(key: &str, parent: Option<&str>, label: Option<&str>, ids: &[&str]) -> PersistedTreeNode {
    PersistedTreeNode {
        key: TreeNodeKey::new(key),
        parent: parent.map(TreeNodeKey::new),
        group: Some(GroupKey::new(format!("g-{}", key))),
        group_label: label.map(str::to_string),
        identifiers: ids.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn given_persisted_nodes_when_reconstructing_then_links_by_parent_key() {
    // Child listed before its parent
    let nodes = vec![
        persisted("n2", Some("n1"), Some("Assets - Current"), &["1000"]),
        persisted("n1", None, Some("Assets"), &[]),
    ];

    let tree = TreeBuilder::from_persisted(&nodes);

    assert_eq!(tree.len(), 3);
    assert_eq!(labels_below(&tree, &[]), vec!["Assets"]);
    assert_eq!(labels_below(&tree, &["Assets"]), vec!["Assets - Current"]);

    let assets = tree.find_child(tree.root(), "Assets").expect("Assets");
    let current = tree.find_child(assets, "Assets - Current").expect("child");
    let node = tree.node(current).expect("node");
    assert_eq!(node.tree_key, Some(TreeNodeKey::new("n2")));
    assert_eq!(node.group_key, Some(GroupKey::new("g-n2")));
    assert_eq!(node.identifiers, BTreeSet::from(["1000".to_string()]));
}

#[test]
fn given_dangling_parent_when_reconstructing_then_attaches_to_root() {
    let nodes = vec![
        persisted("n1", None, Some("Assets"), &[]),
        persisted("n2", Some("gone"), Some("Orphan"), &["7000", "7100"]),
        persisted("n3", Some("n3"), Some("Loop"), &["8000"]),
    ];

    let tree = TreeBuilder::from_persisted(&nodes);

    assert_eq!(labels_below(&tree, &[]), vec!["Assets", "Orphan", "Loop"]);
    assert_eq!(tree.depth(), 1);

    let orphan = tree.find_child(tree.root(), "Orphan").expect("Orphan");
    let node = tree.node(orphan).expect("node");
    assert_eq!(node.identifiers, BTreeSet::from(["7000".to_string(), "7100".to_string()]));
    assert_eq!(node.tree_key, Some(TreeNodeKey::new("n2")));
    let looped = tree.find_child(tree.root(), "Loop").expect("Loop");
    assert_eq!(
        tree.node(looped).expect("node").identifiers,
        BTreeSet::from(["8000".to_string()])
    );
}

#[test]
fn given_missing_group_label_when_reconstructing_then_node_has_no_label() {
    let nodes = vec![persisted("n1", None, None, &["1"])];

    let tree = TreeBuilder::from_persisted(&nodes);

    let child = tree.children(tree.root())[0];
    assert!(tree.node(child).expect("node").label.is_none());
}

#[test]
fn given_no_nodes_when_reconstructing_then_returns_bare_root() {
    let tree = TreeBuilder::from_persisted(&[]);
    assert!(tree.is_empty());
}
