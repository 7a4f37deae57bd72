//! Tree reconciliation service
//!
//! Walks the desired tree and the observed tree together and issues the store
//! calls that bring the persisted hierarchy in line with the desired one.

use std::fmt;
use std::io;
use std::sync::Arc;

use generational_arena::Index;
use tracing::{debug, error, info, instrument};

use crate::domain::{PathSeparator, PathTree, PersistenceIntent, TreeNodeDraft, TreeNodeKey};
use crate::infrastructure::traits::CategoryStore;

/// Store operation that failed during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOperation {
    CreateGroup,
    CreateTreeNode,
    UpdateTreeNode,
}

impl fmt::Display for MergeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateGroup => write!(f, "create group"),
            Self::CreateTreeNode => write!(f, "create tree node"),
            Self::UpdateTreeNode => write!(f, "update tree node"),
        }
    }
}

/// A failed store call; the affected branch stays unsynchronized until the next run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFailure {
    pub operation: MergeOperation,
    /// Group label of the affected node
    pub label: String,
    pub message: String,
}

/// Result of one merge.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Applied store calls, in issue order
    pub intents: Vec<PersistenceIntent>,
    pub failures: Vec<MergeFailure>,
}

impl MergeReport {
    pub fn groups_created(&self) -> usize {
        self.count(|i| matches!(i, PersistenceIntent::CreateGroup { .. }))
    }

    pub fn nodes_created(&self) -> usize {
        self.count(|i| matches!(i, PersistenceIntent::CreateTreeNode { .. }))
    }

    pub fn nodes_updated(&self) -> usize {
        self.count(|i| matches!(i, PersistenceIntent::UpdateTreeNode { .. }))
    }

    fn count(&self, pred: impl Fn(&PersistenceIntent) -> bool) -> usize {
        self.intents.iter().filter(|i| pred(i)).count()
    }
}

/// Reconciles a desired tree against an observed tree.
pub struct TreeMerger {
    store: Arc<dyn CategoryStore>,
    separator: PathSeparator,
}

impl TreeMerger {
    pub fn new(store: Arc<dyn CategoryStore>, separator: PathSeparator) -> Self {
        Self { store, separator }
    }

    /// Merge `desired` into the store, using `observed` as the persisted state.
    ///
    /// `identifiers[i]` is the resolved external id of record `i`; unresolved
    /// records contribute nothing. Identifier sets, tree keys and group keys of
    /// `desired` are filled in as a side effect.
    #[instrument(level = "debug", skip_all)]
    pub fn merge(
        &self,
        desired: &mut PathTree,
        observed: &PathTree,
        identifiers: &[Option<String>],
    ) -> MergeReport {
        let mut run = MergeRun {
            store: self.store.as_ref(),
            separator: &self.separator,
            desired,
            observed,
            identifiers,
            report: MergeReport::default(),
        };
        let root = run.desired.root();
        run.merge_node(root, Some(observed.root()), &[], None);
        debug!(
            "merge: {} intents, {} failures",
            run.report.intents.len(),
            run.report.failures.len()
        );
        run.report
    }
}

struct MergeRun<'a> {
    store: &'a dyn CategoryStore,
    separator: &'a PathSeparator,
    desired: &'a mut PathTree,
    observed: &'a PathTree,
    identifiers: &'a [Option<String>],
    report: MergeReport,
}

impl MergeRun<'_> {
    fn merge_node(
        &mut self,
        idx: Index,
        matched: Option<Index>,
        path: &[String],
        parent: Option<TreeNodeKey>,
    ) {
        self.collect_leaf_identifiers(idx);
        match matched {
            Some(observed_idx) => self.update_matched(idx, observed_idx, path, parent),
            None => self.create_unmatched(idx, path, parent),
        }
    }

    fn collect_leaf_identifiers(&mut self, idx: Index) {
        let identifiers = self.identifiers;
        if let Some(node) = self.desired.node_mut(idx) {
            let resolved = node
                .leaves
                .iter()
                .filter_map(|&leaf| identifiers.get(leaf).and_then(|id| id.clone()));
            node.identifiers.extend(resolved);
        }
    }

    fn create_unmatched(&mut self, idx: Index, path: &[String], parent: Option<TreeNodeKey>) {
        let label = self.separator.join(path);
        info!("creating: {}", label);

        let group = match self.store.create_group(&label) {
            Ok(key) => key,
            Err(e) => return self.fail(MergeOperation::CreateGroup, label, e),
        };
        self.report.intents.push(PersistenceIntent::CreateGroup {
            label: label.clone(),
        });

        let draft = TreeNodeDraft {
            parent,
            identifiers: self
                .desired
                .node(idx)
                .map(|n| n.identifiers.clone())
                .unwrap_or_default(),
            group: Some(group.clone()),
        };
        let key = match self.store.create_tree_node(&draft) {
            Ok(key) => key,
            Err(e) => return self.fail(MergeOperation::CreateTreeNode, label, e),
        };
        self.report
            .intents
            .push(PersistenceIntent::CreateTreeNode { node: draft });

        if let Some(node) = self.desired.node_mut(idx) {
            node.group_key = Some(group);
            node.tree_key = Some(key.clone());
        }

        for child in self.desired.children(idx).to_vec() {
            let child_path = self.child_path(path, child);
            self.merge_node(child, None, &child_path, Some(key.clone()));
        }
    }

    fn update_matched(
        &mut self,
        idx: Index,
        observed_idx: Index,
        path: &[String],
        parent: Option<TreeNodeKey>,
    ) {
        let observed = self.observed;
        let Some(observed_node) = observed.node(observed_idx) else {
            return self.create_unmatched(idx, path, parent);
        };

        let tree_key = observed_node.tree_key.clone();
        if let Some(node) = self.desired.node_mut(idx) {
            node.identifiers
                .extend(observed_node.identifiers.iter().cloned());
            node.group_key = observed_node.group_key.clone();
            node.tree_key = tree_key.clone();
        }

        for child in self.desired.children(idx).to_vec() {
            let child_path = self.child_path(path, child);
            let full_path = self.separator.join(&child_path);
            // Observed labels already hold the full group name
            let hit = observed.children(observed_idx).iter().copied().find(|&o| {
                observed
                    .node(o)
                    .and_then(|n| n.label.as_deref())
                    .is_some_and(|l| l == full_path)
            });
            self.merge_node(child, hit, &child_path, tree_key.clone());
        }

        if self.desired.is_root(idx) {
            return;
        }
        let Some(key) = tree_key else {
            return;
        };
        let label = self.separator.join(path);
        info!("updating: {}", label);

        let draft = match self.desired.node(idx) {
            Some(node) => TreeNodeDraft {
                parent,
                identifiers: node.identifiers.clone(),
                group: node.group_key.clone(),
            },
            None => return,
        };
        match self.store.update_tree_node(&key, &draft) {
            Ok(()) => self
                .report
                .intents
                .push(PersistenceIntent::UpdateTreeNode { key, node: draft }),
            Err(e) => self.fail(MergeOperation::UpdateTreeNode, label, e),
        }
    }

    fn child_path(&self, path: &[String], child: Index) -> Vec<String> {
        let label = self
            .desired
            .node(child)
            .and_then(|n| n.label.clone())
            .unwrap_or_default();
        let mut child_path = path.to_vec();
        child_path.push(label);
        child_path
    }

    fn fail(&mut self, operation: MergeOperation, label: String, e: io::Error) {
        error!("{} failed for '{}': {}", operation, label, e);
        self.report.failures.push(MergeFailure {
            operation,
            label,
            message: e.to_string(),
        });
    }
}
