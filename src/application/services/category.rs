//! Flat category upload
//!
//! Creates or updates one category document per record, keyed by external id.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{CategoryKey, CategoryRecord, PersistenceIntent, SyncSummary};
use crate::infrastructure::traits::CategoryStore;

/// Outcome of a category upload.
#[derive(Debug, Clone, Default)]
pub struct CategorySync {
    pub summary: SyncSummary,
    /// Applied store calls, in record order
    pub intents: Vec<PersistenceIntent>,
}

/// Service for uploading flat category records.
pub struct CategoryService {
    store: Arc<dyn CategoryStore>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    /// Upload `records` in order and resolve their identifiers.
    ///
    /// Records whose id already exists in the store are updated, all others are
    /// created. `identifiers[i]` is set to the record's id once its call
    /// succeeded; failed calls are logged and leave the slot `None`.
    ///
    /// # Errors
    /// Fails only when the persisted categories cannot be loaded.
    #[instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub fn sync(
        &self,
        records: &[CategoryRecord],
        identifiers: &mut [Option<String>],
    ) -> ApplicationResult<CategorySync> {
        let existing: HashMap<String, CategoryKey> = self
            .store
            .load_categories()
            .with_store_context("load categories")?
            .into_iter()
            .map(|c| (c.id, c.key))
            .collect();
        debug!("sync: {} categories already persisted", existing.len());

        let mut outcome = CategorySync::default();
        for (i, record) in records.iter().enumerate() {
            let (result, intent) = match existing.get(&record.id) {
                Some(key) => (
                    self.store.update_category(key, record),
                    PersistenceIntent::UpdateCategory {
                        key: key.clone(),
                        record: record.clone(),
                    },
                ),
                None => (
                    self.store.create_category(record).map(|_| ()),
                    PersistenceIntent::CreateCategory {
                        record: record.clone(),
                    },
                ),
            };

            match result {
                Ok(()) => {
                    if matches!(intent, PersistenceIntent::CreateCategory { .. }) {
                        outcome.summary.created += 1;
                    } else {
                        outcome.summary.updated += 1;
                    }
                    if let Some(slot) = identifiers.get_mut(i) {
                        *slot = Some(record.id.clone());
                    }
                    outcome.intents.push(intent);
                }
                Err(e) => {
                    error!("{} failed: {}", intent, e);
                    outcome.summary.failed += 1;
                }
            }
        }
        Ok(outcome)
    }
}
