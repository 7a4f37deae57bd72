//! I/O boundary traits for testability
//!
//! These traits abstract the persistence layer and the row source, allowing
//! services to be tested with in-memory implementations.

use std::io;

use crate::domain::{
    CategoryKey, CategoryRecord, GroupKey, PersistedCategory, PersistedGroup, RawRow,
    StoredTreeNode, TreeNodeDraft, TreeNodeKey,
};

/// Persistence primitives for categories, groups and hierarchy nodes.
///
/// Every call is applied immediately; there is no transaction spanning calls.
pub trait CategoryStore: Send + Sync {
    /// Read all category documents.
    fn load_categories(&self) -> io::Result<Vec<PersistedCategory>>;

    /// Read all groups.
    fn load_groups(&self) -> io::Result<Vec<PersistedGroup>>;

    /// Read all hierarchy nodes.
    fn load_tree_nodes(&self) -> io::Result<Vec<StoredTreeNode>>;

    /// Create a category document. Fails if the external id already exists.
    fn create_category(&self, record: &CategoryRecord) -> io::Result<CategoryKey>;

    /// Overwrite an existing category document.
    fn update_category(&self, key: &CategoryKey, record: &CategoryRecord) -> io::Result<()>;

    /// Create a group and return its key.
    fn create_group(&self, name: &str) -> io::Result<GroupKey>;

    /// Create a hierarchy node and return its key.
    fn create_tree_node(&self, node: &TreeNodeDraft) -> io::Result<TreeNodeKey>;

    /// Overwrite parent, identifiers and group of an existing hierarchy node.
    fn update_tree_node(&self, key: &TreeNodeKey, node: &TreeNodeDraft) -> io::Result<()>;
}

/// Tabular source of raw category rows.
pub trait RowSource: Send + Sync {
    /// Read all rows in source order.
    fn read_rows(&self) -> io::Result<Vec<RawRow>>;
}
