//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the I/O boundary trait (CategoryStore)
//! but are themselves concrete structs, not traits.

mod category;
mod coordinator;
mod merge;

pub use category::{CategoryService, CategorySync};
pub use coordinator::{CategorySyncCoordinator, RunReport, SyncContext};
pub use merge::{MergeFailure, MergeOperation, MergeReport, TreeMerger};
