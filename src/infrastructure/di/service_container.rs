//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::CategorySyncCoordinator;
use crate::application::ApplicationError;
use crate::config::Settings;
use crate::domain::{PathSeparator, RangeParser, SelectorRangeParser};
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::store::JsonFileStore;
use crate::infrastructure::traits::CategoryStore;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Persistence backend
    pub store: Arc<dyn CategoryStore>,

    /// Range cell parser
    pub parser: Arc<dyn RangeParser>,
}

impl ServiceContainer {
    /// Create a new service container backed by the configured JSON store.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let store = JsonFileStore::open(&settings.store_path)?;
        Ok(Self::with_deps(
            settings,
            Arc::new(store),
            Arc::new(SelectorRangeParser),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        store: Arc<dyn CategoryStore>,
        parser: Arc<dyn RangeParser>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            store,
            parser,
        }
    }

    /// Import coordinator over this container's store.
    pub fn coordinator(&self) -> Result<CategorySyncCoordinator, ApplicationError> {
        self.coordinator_for(Arc::clone(&self.store))
    }

    /// Import coordinator over another store, e.g. an in-memory copy for dry runs.
    pub fn coordinator_for(
        &self,
        store: Arc<dyn CategoryStore>,
    ) -> Result<CategorySyncCoordinator, ApplicationError> {
        let separator = PathSeparator::new(&self.settings.path_separator)?;
        Ok(CategorySyncCoordinator::new(
            store,
            Arc::clone(&self.parser),
            separator,
        ))
    }
}
