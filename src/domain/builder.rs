//! Tree builder for the desired hierarchy (from source rows) and the observed
//! hierarchy (from persisted nodes).

use std::collections::HashMap;
use std::sync::Arc;

use generational_arena::Index;
use tracing::{debug, trace, warn};

use crate::domain::arena::{PathNode, PathTree};
use crate::domain::entities::{CategoryRecord, PathSeparator, PersistedTreeNode, RawRow, SourceRow};
use crate::domain::range::{range_expression, RangeParser};

/// Constructs category hierarchies.
pub struct TreeBuilder {
    separator: PathSeparator,
    parser: Arc<dyn RangeParser>,
}

impl TreeBuilder {
    pub fn new(separator: PathSeparator, parser: Arc<dyn RangeParser>) -> Self {
        Self { separator, parser }
    }

    pub fn separator(&self) -> &PathSeparator {
        &self.separator
    }

    /// Build the desired tree and the flat record list from raw rows.
    ///
    /// Rows without a numeric id, a group path or a name are skipped. Each kept
    /// row becomes a record attached as a leaf to the node of its group path.
    pub fn from_rows(&self, rows: &[RawRow]) -> (Vec<CategoryRecord>, PathTree) {
        let mut tree = PathTree::new();
        let mut records = Vec::new();

        for (line, raw) in rows.iter().enumerate() {
            let Some(row) = SourceRow::from_raw(raw) else {
                debug!("skipping row {}: {:?}", line + 1, raw);
                continue;
            };
            let segments = self.separator.split(&row.group_path);
            let node = tree.insert_path(tree.root(), &segments);

            records.push(CategoryRecord {
                id: row.id,
                name: row.name,
                range_expression: range_expression(
                    self.parser.as_ref(),
                    &row.range_a,
                    &row.range_b,
                ),
            });
            tree.attach_leaf(node, records.len() - 1);
            trace!(
                "record {} attached to {:?}",
                records.len() - 1,
                tree.path_of(node)
            );
        }

        debug!(
            "from_rows: {} records, {} tree nodes, depth {}",
            records.len(),
            tree.len(),
            tree.depth()
        );
        (records, tree)
    }

    /// Rebuild the observed tree from persisted nodes.
    ///
    /// Nodes whose parent key matches no persisted node are reattached under the
    /// root instead of failing, so an inconsistent store still yields a tree.
    pub fn from_persisted(nodes: &[PersistedTreeNode]) -> PathTree {
        let mut tree = PathTree::new();
        let root = tree.root();

        let mut indices: Vec<Index> = Vec::with_capacity(nodes.len());
        let mut by_key = HashMap::with_capacity(nodes.len());
        for persisted in nodes {
            // Linked below, once every key has an index
            let idx = tree.add_detached(PathNode {
                label: persisted.group_label.clone(),
                identifiers: persisted.identifiers.clone(),
                tree_key: Some(persisted.key.clone()),
                group_key: persisted.group.clone(),
                ..Default::default()
            });
            by_key.insert(persisted.key.clone(), idx);
            indices.push(idx);
        }

        for (persisted, &idx) in nodes.iter().zip(&indices) {
            let parent = match &persisted.parent {
                None => root,
                Some(parent_key) => match by_key.get(parent_key) {
                    Some(&parent_idx) if parent_idx != idx => parent_idx,
                    _ => {
                        warn!(
                            "tree node {} references missing parent {}, attaching to root",
                            persisted.key, parent_key
                        );
                        root
                    }
                },
            };
            tree.link(parent, idx);
        }

        debug!("from_persisted: {} tree nodes", tree.len());
        tree
    }
}
