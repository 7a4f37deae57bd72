//! Category store implementations
//!
//! `JsonFileStore` keeps the whole persisted state in one JSON document that is
//! rewritten after every mutation. `InMemoryStore` holds the same state in
//! memory and can be told to fail selected calls.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{
    CategoryKey, CategoryRecord, GroupKey, PersistedCategory, PersistedGroup, StoreSnapshot,
    StoredTreeNode, TreeNodeDraft, TreeNodeKey,
};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::CategoryStore;

fn new_key() -> String {
    Uuid::new_v4().simple().to_string()
}

fn not_found(what: &str, key: &impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found: {}", what, key))
}

fn lock<T>(mutex: &Mutex<T>) -> io::Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "store lock poisoned"))
}

// ============================================================
// SNAPSHOT MUTATIONS
// ============================================================

fn insert_category(state: &mut StoreSnapshot, record: &CategoryRecord) -> io::Result<CategoryKey> {
    if state.categories.iter().any(|c| c.id == record.id) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("category id already exists: {}", record.id),
        ));
    }
    let key = CategoryKey::new(new_key());
    state.categories.push(PersistedCategory {
        key: key.clone(),
        id: record.id.clone(),
        name: record.name.clone(),
        range_expression: record.range_expression.clone(),
    });
    Ok(key)
}

fn replace_category(
    state: &mut StoreSnapshot,
    key: &CategoryKey,
    record: &CategoryRecord,
) -> io::Result<()> {
    let category = state
        .categories
        .iter_mut()
        .find(|c| &c.key == key)
        .ok_or_else(|| not_found("category", key))?;
    category.id = record.id.clone();
    category.name = record.name.clone();
    category.range_expression = record.range_expression.clone();
    Ok(())
}

fn insert_group(state: &mut StoreSnapshot, name: &str) -> GroupKey {
    let key = GroupKey::new(new_key());
    state.groups.push(PersistedGroup {
        key: key.clone(),
        name: name.to_string(),
    });
    key
}

fn insert_tree_node(state: &mut StoreSnapshot, node: &TreeNodeDraft) -> TreeNodeKey {
    let key = TreeNodeKey::new(new_key());
    state.tree_nodes.push(StoredTreeNode {
        key: key.clone(),
        parent: node.parent.clone(),
        group: node.group.clone(),
        identifiers: node.identifiers.clone(),
    });
    key
}

fn replace_tree_node(
    state: &mut StoreSnapshot,
    key: &TreeNodeKey,
    node: &TreeNodeDraft,
) -> io::Result<()> {
    let stored = state
        .tree_nodes
        .iter_mut()
        .find(|n| &n.key == key)
        .ok_or_else(|| not_found("tree node", key))?;
    stored.parent = node.parent.clone();
    stored.group = node.group.clone();
    stored.identifiers = node.identifiers.clone();
    Ok(())
}

// ============================================================
// IN-MEMORY STORE
// ============================================================

/// Calls an [`InMemoryStore`] is told to reject.
#[derive(Debug, Default)]
struct FailureRules {
    groups: HashSet<String>,
    tree_node_updates: HashSet<TreeNodeKey>,
    categories: HashSet<String>,
    tree_node_creates: bool,
}

/// In-memory store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreSnapshot>,
    failures: Mutex<FailureRules>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            failures: Mutex::default(),
        }
    }

    /// Copy everything `store` holds into a new in-memory store.
    pub fn copy_of(store: &dyn CategoryStore) -> io::Result<Self> {
        Ok(Self::from_snapshot(StoreSnapshot {
            categories: store.load_categories()?,
            groups: store.load_groups()?,
            tree_nodes: store.load_tree_nodes()?,
        }))
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> io::Result<StoreSnapshot> {
        Ok(lock(&self.state)?.clone())
    }

    /// Reject `create_group` for this label.
    pub fn fail_group(&self, label: &str) -> io::Result<()> {
        lock(&self.failures)?.groups.insert(label.to_string());
        Ok(())
    }

    /// Reject every `create_tree_node`.
    pub fn fail_tree_node_creates(&self) -> io::Result<()> {
        lock(&self.failures)?.tree_node_creates = true;
        Ok(())
    }

    /// Reject `update_tree_node` for this key.
    pub fn fail_tree_node_update(&self, key: &TreeNodeKey) -> io::Result<()> {
        lock(&self.failures)?.tree_node_updates.insert(key.clone());
        Ok(())
    }

    /// Reject create and update of the category with this external id.
    pub fn fail_category(&self, id: &str) -> io::Result<()> {
        lock(&self.failures)?.categories.insert(id.to_string());
        Ok(())
    }

    fn injected(message: String) -> io::Error {
        io::Error::new(io::ErrorKind::Other, message)
    }
}

impl CategoryStore for InMemoryStore {
    fn load_categories(&self) -> io::Result<Vec<PersistedCategory>> {
        Ok(lock(&self.state)?.categories.clone())
    }

    fn load_groups(&self) -> io::Result<Vec<PersistedGroup>> {
        Ok(lock(&self.state)?.groups.clone())
    }

    fn load_tree_nodes(&self) -> io::Result<Vec<StoredTreeNode>> {
        Ok(lock(&self.state)?.tree_nodes.clone())
    }

    fn create_category(&self, record: &CategoryRecord) -> io::Result<CategoryKey> {
        if lock(&self.failures)?.categories.contains(&record.id) {
            return Err(Self::injected(format!("rejected category {}", record.id)));
        }
        insert_category(&mut *lock(&self.state)?, record)
    }

    fn update_category(&self, key: &CategoryKey, record: &CategoryRecord) -> io::Result<()> {
        if lock(&self.failures)?.categories.contains(&record.id) {
            return Err(Self::injected(format!("rejected category {}", record.id)));
        }
        replace_category(&mut *lock(&self.state)?, key, record)
    }

    fn create_group(&self, name: &str) -> io::Result<GroupKey> {
        if lock(&self.failures)?.groups.contains(name) {
            return Err(Self::injected(format!("rejected group {}", name)));
        }
        Ok(insert_group(&mut *lock(&self.state)?, name))
    }

    fn create_tree_node(&self, node: &TreeNodeDraft) -> io::Result<TreeNodeKey> {
        if lock(&self.failures)?.tree_node_creates {
            return Err(Self::injected("rejected tree node".to_string()));
        }
        Ok(insert_tree_node(&mut *lock(&self.state)?, node))
    }

    fn update_tree_node(&self, key: &TreeNodeKey, node: &TreeNodeDraft) -> io::Result<()> {
        if lock(&self.failures)?.tree_node_updates.contains(key) {
            return Err(Self::injected(format!("rejected tree node update {}", key)));
        }
        replace_tree_node(&mut *lock(&self.state)?, key, node)
    }
}

// ============================================================
// JSON FILE STORE
// ============================================================

/// Store backed by a single JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<StoreSnapshot>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store; it is created
    /// on the first write.
    #[instrument(level = "debug")]
    pub fn open(path: &Path) -> InfraResult<Self> {
        let snapshot = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| InfraError::io(format!("read store {}", path.display()), e))?;
            serde_json::from_str(&content).map_err(|e| InfraError::CorruptStore {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            debug!("store {} does not exist yet", path.display());
            StoreSnapshot::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> io::Result<StoreSnapshot> {
        Ok(lock(&self.state)?.clone())
    }

    /// Apply `change` to a copy of the state, write it, then keep it.
    fn mutate<T>(&self, change: impl FnOnce(&mut StoreSnapshot) -> io::Result<T>) -> io::Result<T> {
        let mut state = lock(&self.state)?;
        let mut next = state.clone();
        let value = change(&mut next)?;
        self.write(&next)?;
        *state = next;
        Ok(value)
    }

    fn write(&self, snapshot: &StoreSnapshot) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl CategoryStore for JsonFileStore {
    fn load_categories(&self) -> io::Result<Vec<PersistedCategory>> {
        Ok(lock(&self.state)?.categories.clone())
    }

    fn load_groups(&self) -> io::Result<Vec<PersistedGroup>> {
        Ok(lock(&self.state)?.groups.clone())
    }

    fn load_tree_nodes(&self) -> io::Result<Vec<StoredTreeNode>> {
        Ok(lock(&self.state)?.tree_nodes.clone())
    }

    fn create_category(&self, record: &CategoryRecord) -> io::Result<CategoryKey> {
        self.mutate(|state| insert_category(state, record))
    }

    fn update_category(&self, key: &CategoryKey, record: &CategoryRecord) -> io::Result<()> {
        self.mutate(|state| replace_category(state, key, record))
    }

    fn create_group(&self, name: &str) -> io::Result<GroupKey> {
        self.mutate(|state| Ok(insert_group(state, name)))
    }

    fn create_tree_node(&self, node: &TreeNodeDraft) -> io::Result<TreeNodeKey> {
        self.mutate(|state| Ok(insert_tree_node(state, node)))
    }

    fn update_tree_node(&self, key: &TreeNodeKey, node: &TreeNodeDraft) -> io::Result<()> {
        self.mutate(|state| replace_tree_node(state, key, node))
    }
}
