//! Rendering of category hierarchies for the terminal.

use generational_arena::Index;
use termtree::Tree;

use crate::domain::{PathNode, PathTree};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for PathTree {
    /// Each node shows its label and, when present, its identifiers.
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(tree: &PathTree, idx: Index, parent_tree: &mut Tree<String>) {
            for &child_idx in tree.children(idx) {
                if let Some(child) = tree.node(child_idx) {
                    let mut child_tree = Tree::new(describe(child));
                    build_tree(tree, child_idx, &mut child_tree);
                    parent_tree.push(child_tree);
                }
            }
        }

        let mut root = Tree::new("categories".to_string());
        build_tree(self, self.root(), &mut root);
        root
    }
}

fn describe(node: &PathNode) -> String {
    if node.identifiers.is_empty() {
        node.to_string()
    } else {
        let ids: Vec<&str> = node.identifiers.iter().map(String::as_str).collect();
        format!("{} [{}]", node, ids.join(", "))
    }
}
