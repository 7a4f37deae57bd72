//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod range;

pub use arena::{PathNode, PathTree};
pub use builder::TreeBuilder;
pub use entities::*;
pub use error::DomainError;
pub use range::{range_expression, RangeParser, RangeSelection, SelectorRangeParser};
