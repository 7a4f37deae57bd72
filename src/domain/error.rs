//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the import model itself.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid column reference: {0:?} (expected letters like A, M or AB)")]
    InvalidColumn(String),

    #[error("path separator must not be empty")]
    EmptySeparator,
}
