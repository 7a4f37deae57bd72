//! Tests for the arena-backed PathTree

use coasync::domain::{PathNode, PathTree};

// ============================================================
// Path insertion
// ============================================================

#[test]
fn given_new_tree_when_created_then_holds_only_unlabeled_root() {
    let tree = PathTree::new();

    assert_eq!(tree.len(), 1);
    assert!(tree.is_empty());
    assert_eq!(tree.depth(), 0);
    let root = tree.node(tree.root()).expect("root");
    assert!(root.label.is_none());
    assert!(root.parent.is_none());
}

#[test]
fn given_shared_prefix_when_inserting_paths_then_reuses_existing_nodes() {
    let mut tree = PathTree::new();
    let root = tree.root();

    let current = tree.insert_path(root, &["Assets", "Current"]);
    let fixed = tree.insert_path(root, &["Assets", "Fixed"]);

    // root, Assets, Current, Fixed
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.children(root).len(), 1);
    let assets = tree.find_child(root, "Assets").expect("Assets");
    assert_eq!(tree.children(assets), &[current, fixed]);
    assert_eq!(tree.depth(), 2);
}

#[test]
fn given_same_path_twice_when_inserting_then_returns_same_index() {
    let mut tree = PathTree::new();
    let root = tree.root();

    let first = tree.insert_path(root, &["Income", "Sales"]);
    let second = tree.insert_path(root, &["Income", "Sales"]);

    assert_eq!(first, second);
    assert_eq!(tree.len(), 3);
}

#[test]
fn given_empty_path_when_inserting_then_returns_start_node() {
    let mut tree = PathTree::new();
    let root = tree.root();
    let empty: [&str; 0] = [];

    assert_eq!(tree.insert_path(root, &empty), root);
    assert_eq!(tree.len(), 1);
}

#[test]
fn given_blank_segment_when_inserting_then_creates_node_with_empty_label() {
    let mut tree = PathTree::new();
    let root = tree.root();

    let leaf = tree.insert_path(root, &["Income", "", "Sales"]);

    assert_eq!(tree.path_of(leaf), vec!["Income", "", "Sales"]);
    assert_eq!(tree.depth(), 3);
}

// ============================================================
// Leaves and navigation
// ============================================================

#[test]
fn given_duplicate_leaf_when_attaching_then_keeps_both_entries() {
    let mut tree = PathTree::new();
    let root = tree.root();
    let node = tree.insert_path(root, &["Expenses"]);

    tree.attach_leaf(node, 3);
    tree.attach_leaf(node, 3);

    assert_eq!(tree.node(node).expect("node").leaves, vec![3, 3]);
}

#[test]
fn given_sibling_labels_when_finding_child_then_matches_exact_label_only() {
    let mut tree = PathTree::new();
    let root = tree.root();
    tree.insert_path(root, &["Assets"]);

    assert!(tree.find_child(root, "Assets").is_some());
    assert!(tree.find_child(root, "assets").is_none());
    assert!(tree.find_child(root, "Assets ").is_none());
}

#[test]
fn given_nested_tree_when_iterating_then_visits_in_pre_order() {
    let mut tree = PathTree::new();
    let root = tree.root();
    tree.insert_path(root, &["A", "A1"]);
    tree.insert_path(root, &["A", "A2"]);
    tree.insert_path(root, &["B"]);

    let labels: Vec<String> = tree.iter().map(|(_, node)| node.to_string()).collect();

    assert_eq!(labels, vec!["<root>", "A", "A1", "A2", "B"]);
}

#[test]
fn given_detached_node_when_linking_then_becomes_last_child() {
    let mut tree = PathTree::new();
    let root = tree.root();
    tree.insert_path(root, &["First"]);

    let idx = tree.add_detached(PathNode::new(Some("Second".to_string()), None));
    assert!(tree.node(idx).expect("detached").parent.is_none());
    tree.link(root, idx);

    assert_eq!(tree.children(root).last(), Some(&idx));
    assert_eq!(tree.node(idx).expect("linked").parent, Some(root));
    assert!(!tree.is_root(idx));
    assert!(tree.is_root(root));
}
