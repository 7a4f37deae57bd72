//! coasync: chart-of-accounts importer
//!
//! Reads category rows, builds the desired category tree, uploads the flat
//! categories and reconciles the tree with the one already persisted.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
