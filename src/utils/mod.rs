//! Utility modules for duplicate resolution
//!
//! - Rank: descending rank statistics (average/min/max/first)
//! - LazyFrame helpers: known-schema projection with column validation

pub mod rank;
pub mod lazy_helpers;

// Re-export commonly used types
pub use rank::{rank_all_descending, Ranks};
pub use lazy_helpers::{project_schema, require_columns, ColumnSpec};
