//! Domain entities: core data structures

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

macro_rules! store_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

store_key!(
    /// Store-assigned key of a persisted category document.
    CategoryKey
);
store_key!(
    /// Store-assigned key of a persisted category group.
    GroupKey
);
store_key!(
    /// Store-assigned key of a persisted hierarchy node.
    TreeNodeKey
);

/// Set of external category ids attached to a hierarchy node.
pub type IdentifierSet = BTreeSet<String>;

/// Cells of one source row, trimmed, before validation.
///
/// Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub id: Option<String>,
    pub group_path: Option<String>,
    pub name: Option<String>,
    pub range_a: Option<String>,
    pub range_b: Option<String>,
}

impl RawRow {
    /// Convenience constructor for the three mandatory cells.
    pub fn new(id: &str, group_path: &str, name: &str) -> Self {
        Self {
            id: non_empty(id),
            group_path: non_empty(group_path),
            name: non_empty(name),
            range_a: None,
            range_b: None,
        }
    }

    pub fn with_ranges(mut self, range_a: &str, range_b: &str) -> Self {
        self.range_a = non_empty(range_a);
        self.range_b = non_empty(range_b);
        self
    }
}

/// Trim a cell and map blanks to `None`.
pub fn non_empty(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A row that passed shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub id: String,
    pub group_path: String,
    pub name: String,
    pub range_a: String,
    pub range_b: String,
}

impl SourceRow {
    /// Validate a raw row.
    ///
    /// Returns `None` when the id is missing or not a finite number, or when the group
    /// path or name is missing. Such rows are filtered, not reported.
    pub fn from_raw(raw: &RawRow) -> Option<Self> {
        let id = raw.id.as_deref()?;
        if !is_numeric(id) {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            group_path: raw.group_path.clone()?,
            name: raw.name.clone()?,
            range_a: raw.range_a.clone().unwrap_or_default(),
            range_b: raw.range_b.clone().unwrap_or_default(),
        })
    }
}

/// Finite decimal number; `inf` and `NaN` parse as floats but are not ids.
fn is_numeric(value: &str) -> bool {
    matches!(value.parse::<f64>(), Ok(v) if v.is_finite())
}

/// Flat category record, one per valid source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// External id, unique across the store
    pub id: String,
    pub name: String,
    /// Query string produced by the range parser (may be empty)
    pub range_expression: String,
}

/// Category document as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCategory {
    pub key: CategoryKey,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub range_expression: String,
}

/// Named group in the persisted hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGroup {
    pub key: GroupKey,
    pub name: String,
}

/// Payload written when creating or updating a hierarchy node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNodeDraft {
    pub parent: Option<TreeNodeKey>,
    #[serde(default)]
    pub identifiers: IdentifierSet,
    pub group: Option<GroupKey>,
}

/// Hierarchy node as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTreeNode {
    pub key: TreeNodeKey,
    pub parent: Option<TreeNodeKey>,
    pub group: Option<GroupKey>,
    #[serde(default)]
    pub identifiers: IdentifierSet,
}

/// Hierarchy node joined with the name of its group.
///
/// Input to tree reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTreeNode {
    pub key: TreeNodeKey,
    pub parent: Option<TreeNodeKey>,
    pub group: Option<GroupKey>,
    /// Group name; `None` when the group reference does not resolve
    pub group_label: Option<String>,
    pub identifiers: IdentifierSet,
}

impl PersistedTreeNode {
    pub fn from_stored(node: StoredTreeNode, group_label: Option<String>) -> Self {
        Self {
            key: node.key,
            parent: node.parent,
            group: node.group,
            group_label,
            identifiers: node.identifiers,
        }
    }
}

/// Full persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub categories: Vec<PersistedCategory>,
    #[serde(default)]
    pub groups: Vec<PersistedGroup>,
    #[serde(default)]
    pub tree_nodes: Vec<StoredTreeNode>,
}

/// A persistence call issued during a run, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceIntent {
    CreateGroup {
        label: String,
    },
    CreateTreeNode {
        node: TreeNodeDraft,
    },
    UpdateTreeNode {
        key: TreeNodeKey,
        node: TreeNodeDraft,
    },
    CreateCategory {
        record: CategoryRecord,
    },
    UpdateCategory {
        key: CategoryKey,
        record: CategoryRecord,
    },
}

impl PersistenceIntent {
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            Self::CreateGroup { .. } | Self::CreateTreeNode { .. } | Self::CreateCategory { .. }
        )
    }
}

impl fmt::Display for PersistenceIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateGroup { label } => write!(f, "create group '{}'", label),
            Self::CreateTreeNode { node } => write!(
                f,
                "create node (group {}, {} ids)",
                node.group.as_ref().map(|g| g.as_str()).unwrap_or("-"),
                node.identifiers.len()
            ),
            Self::UpdateTreeNode { key, node } => {
                write!(f, "update node {} ({} ids)", key, node.identifiers.len())
            }
            Self::CreateCategory { record } => {
                write!(f, "create category {} '{}'", record.id, record.name)
            }
            Self::UpdateCategory { record, .. } => {
                write!(f, "update category {} '{}'", record.id, record.name)
            }
        }
    }
}

/// Outcome counts of the category upload phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Splits group paths and joins them back into group labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSeparator {
    separator: String,
    joiner: String,
}

impl PathSeparator {
    pub fn new(separator: &str) -> Result<Self, DomainError> {
        if separator.is_empty() {
            return Err(DomainError::EmptySeparator);
        }
        Ok(Self {
            separator: separator.to_string(),
            joiner: format!(" {} ", separator),
        })
    }

    /// Split a group path into trimmed segments. Blank segments are kept.
    pub fn split(&self, group_path: &str) -> Vec<String> {
        group_path
            .split(self.separator.as_str())
            .map(|s| s.trim().to_string())
            .collect()
    }

    /// Join segments into a group label: `["Income", "Sales"]` → `Income - Sales`.
    pub fn join<S: AsRef<str>>(&self, segments: &[S]) -> String {
        segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(&self.joiner)
    }
}

impl Default for PathSeparator {
    fn default() -> Self {
        Self {
            separator: "-".to_string(),
            joiner: " - ".to_string(),
        }
    }
}

/// Decode a spreadsheet column reference into a zero-based index.
///
/// `A` → 0, `Z` → 25, `AA` → 26. Lowercase is accepted.
pub fn parse_column(column: &str) -> Result<usize, DomainError> {
    let trimmed = column.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::InvalidColumn(column.to_string()));
    }
    let mut value: usize = 0;
    for c in trimmed.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        value = value
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| DomainError::InvalidColumn(column.to_string()))?;
    }
    Ok(value - 1)
}

/// Expand environment variables in a path string.
///
/// Supports `$VAR`, `${VAR}` and `~`.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
