use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{GroupKey, IdentifierSet, TreeNodeKey};

/// Node of a category hierarchy.
///
/// Parent and children are arena indices owned by the enclosing [`PathTree`].
#[derive(Debug, Clone, Default)]
pub struct PathNode {
    /// Path segment (desired tree) or full group name (observed tree); `None` for the root
    pub label: Option<String>,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes, unique by label among siblings
    pub children: Vec<Index>,
    /// Indices into the flat category record list
    pub leaves: Vec<usize>,
    /// External category ids attached to this node
    pub identifiers: IdentifierSet,
    /// Persisted hierarchy node, once matched or created
    pub tree_key: Option<TreeNodeKey>,
    /// Persisted group, once matched or created
    pub group_key: Option<GroupKey>,
}

impl PathNode {
    pub fn new(label: Option<String>, parent: Option<Index>) -> Self {
        Self {
            label,
            parent,
            ..Default::default()
        }
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}", label),
            None => write!(f, "<root>"),
        }
    }
}

/// Arena-based prefix tree of labeled paths.
///
/// The root always exists and carries no label. Depth of a node equals the
/// length of the path that created it.
#[derive(Debug, Clone)]
pub struct PathTree {
    arena: Arena<PathNode>,
    root: Index,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(PathNode::new(None, None));
        Self { arena, root }
    }

    pub fn root(&self) -> Index {
        self.root
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn node(&self, idx: Index) -> Option<&PathNode> {
        self.arena.get(idx)
    }

    pub fn node_mut(&mut self, idx: Index) -> Option<&mut PathNode> {
        self.arena.get_mut(idx)
    }

    /// Children of `idx` in insertion order; empty for unknown indices.
    pub fn children(&self, idx: Index) -> &[Index] {
        self.node(idx).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Append a new node under `parent` without checking sibling labels.
    #[instrument(level = "trace", skip(self))]
    pub fn add_child(&mut self, parent: Index, node: PathNode) -> Index {
        let idx = self.arena.insert(PathNode {
            parent: Some(parent),
            ..node
        });
        if let Some(p) = self.arena.get_mut(parent) {
            p.children.push(idx);
        }
        idx
    }

    /// Insert a node that is not yet linked to a parent.
    pub fn add_detached(&mut self, node: PathNode) -> Index {
        self.arena.insert(PathNode {
            parent: None,
            ..node
        })
    }

    /// Make `child` the last child of `parent`.
    pub fn link(&mut self, parent: Index, child: Index) {
        if let Some(c) = self.arena.get_mut(child) {
            c.parent = Some(parent);
        }
        if let Some(p) = self.arena.get_mut(parent) {
            p.children.push(child);
        }
    }

    pub fn is_root(&self, idx: Index) -> bool {
        idx == self.root
    }

    /// Find the first child of `idx` carrying `label`.
    pub fn find_child(&self, idx: Index, label: &str) -> Option<Index> {
        self.children(idx).iter().copied().find(|&child| {
            self.node(child)
                .and_then(|n| n.label.as_deref())
                .is_some_and(|l| l == label)
        })
    }

    /// Insert a path below `node`, reusing existing children with matching labels.
    ///
    /// Returns the node reached by the last segment, or `node` itself for an
    /// empty path. Repeated insertion of the same path returns the same index.
    #[instrument(level = "trace", skip(self, segments))]
    pub fn insert_path<S: AsRef<str>>(&mut self, node: Index, segments: &[S]) -> Index {
        let Some((first, rest)) = segments.split_first() else {
            return node;
        };
        let label = first.as_ref();
        let next = match self.find_child(node, label) {
            Some(child) => child,
            None => self.add_child(node, PathNode::new(Some(label.to_string()), None)),
        };
        self.insert_path(next, rest)
    }

    /// Attach a record index to `node`. Duplicates are kept.
    pub fn attach_leaf(&mut self, node: Index, leaf: usize) {
        if let Some(n) = self.arena.get_mut(node) {
            n.leaves.push(leaf);
        }
    }

    /// Labels from the root down to `idx`, root excluded.
    pub fn path_of(&self, idx: Index) -> Vec<String> {
        let mut labels = Vec::new();
        let mut current = Some(idx);
        while let Some(i) = current {
            let Some(node) = self.node(i) else { break };
            if let Some(label) = &node.label {
                labels.push(label.clone());
            }
            current = node.parent;
        }
        labels.reverse();
        labels
    }

    /// Pre-order traversal starting at the root.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Number of levels below the root.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.calculate_depth(self.root) - 1
    }

    fn calculate_depth(&self, idx: Index) -> usize {
        1 + self
            .children(idx)
            .iter()
            .map(|&child| self.calculate_depth(child))
            .max()
            .unwrap_or(0)
    }
}

pub struct TreeIterator<'a> {
    tree: &'a PathTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a PathTree) -> Self {
        Self {
            tree,
            stack: vec![tree.root()],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a PathNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}
