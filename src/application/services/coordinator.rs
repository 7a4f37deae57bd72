//! Import pipeline
//!
//! parse rows → desired tree → category upload → load persisted tree →
//! rebuild observed tree → merge. Each stage finishes before the next starts.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::services::category::CategoryService;
use crate::application::services::merge::{MergeReport, TreeMerger};
use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{
    CategoryRecord, PathSeparator, PathTree, PersistedTreeNode, PersistenceIntent, RangeParser,
    RawRow, SyncSummary, TreeBuilder,
};
use crate::infrastructure::traits::CategoryStore;

/// Run-scoped state threaded through the pipeline stages.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub records: Vec<CategoryRecord>,
    pub desired: PathTree,
    /// Resolved external id per record, filled by the upload stage
    pub identifiers: Vec<Option<String>>,
}

impl SyncContext {
    pub fn unresolved(&self) -> usize {
        self.identifiers.iter().filter(|id| id.is_none()).count()
    }
}

/// Result of a full import run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records: usize,
    pub summary: SyncSummary,
    pub category_intents: Vec<PersistenceIntent>,
    pub merge: MergeReport,
}

impl RunReport {
    /// Every applied store call, categories first.
    pub fn intents(&self) -> impl Iterator<Item = &PersistenceIntent> {
        self.category_intents.iter().chain(self.merge.intents.iter())
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0 || !self.merge.failures.is_empty()
    }
}

/// Drives an import against a category store.
pub struct CategorySyncCoordinator {
    store: Arc<dyn CategoryStore>,
    builder: TreeBuilder,
    categories: CategoryService,
    merger: TreeMerger,
}

impl CategorySyncCoordinator {
    pub fn new(
        store: Arc<dyn CategoryStore>,
        parser: Arc<dyn RangeParser>,
        separator: PathSeparator,
    ) -> Self {
        Self {
            builder: TreeBuilder::new(separator.clone(), parser),
            categories: CategoryService::new(Arc::clone(&store)),
            merger: TreeMerger::new(Arc::clone(&store), separator),
            store,
        }
    }

    /// Build the flat record list and the desired tree.
    pub fn parse_rows(&self, rows: &[RawRow]) -> SyncContext {
        let (records, desired) = self.builder.from_rows(rows);
        let identifiers = vec![None; records.len()];
        SyncContext {
            records,
            desired,
            identifiers,
        }
    }

    /// Upload the context's records and resolve their identifiers.
    pub fn sync_categories(
        &self,
        ctx: &mut SyncContext,
    ) -> ApplicationResult<(SyncSummary, Vec<PersistenceIntent>)> {
        let outcome = self.categories.sync(&ctx.records, &mut ctx.identifiers)?;
        info!("Created {} categories.", outcome.summary.created);
        info!("Updated {} categories.", outcome.summary.updated);
        Ok((outcome.summary, outcome.intents))
    }

    /// Load persisted tree nodes joined with their group names.
    pub fn load_persisted_state(&self) -> ApplicationResult<Vec<PersistedTreeNode>> {
        let groups: HashMap<_, _> = self
            .store
            .load_groups()
            .with_store_context("load groups")?
            .into_iter()
            .map(|g| (g.key, g.name))
            .collect();
        let nodes = self
            .store
            .load_tree_nodes()
            .with_store_context("load tree nodes")?
            .into_iter()
            .map(|node| {
                let label = node.group.as_ref().and_then(|g| groups.get(g).cloned());
                PersistedTreeNode::from_stored(node, label)
            })
            .collect::<Vec<_>>();
        debug!(
            "load_persisted_state: {} groups, {} tree nodes",
            groups.len(),
            nodes.len()
        );
        Ok(nodes)
    }

    /// Run the whole pipeline over `rows`.
    ///
    /// # Errors
    /// Fails when the store cannot be read. Individual failed writes are
    /// reported in the returned [`RunReport`] instead.
    #[instrument(level = "debug", skip_all, fields(rows = rows.len()))]
    pub fn run(&self, rows: &[RawRow]) -> ApplicationResult<RunReport> {
        let mut ctx = self.parse_rows(rows);
        info!(
            "parsed {} categories into {} groups",
            ctx.records.len(),
            ctx.desired.len() - 1
        );

        let (summary, category_intents) = self.sync_categories(&mut ctx)?;
        if ctx.unresolved() > 0 {
            debug!("{} records left without identifier", ctx.unresolved());
        }

        let persisted = self.load_persisted_state()?;
        let observed = TreeBuilder::from_persisted(&persisted);
        let merge = self
            .merger
            .merge(&mut ctx.desired, &observed, &ctx.identifiers);

        Ok(RunReport {
            records: ctx.records.len(),
            summary,
            category_intents,
            merge,
        })
    }
}
