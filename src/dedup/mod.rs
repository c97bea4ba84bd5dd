//! Duplicate resolution stages
//!
//! - `grouper`: split a year's records into duplicate groups and singletons
//! - `ranker`: score and rank candidates within each group
//! - `reconciler`: merge kept records back with the singletons

pub mod grouper;
pub mod ranker;
pub mod reconciler;

pub use grouper::{group_duplicates, DuplicateGroup, DuplicatePartition};
pub use ranker::{rank_duplicates, Outcome, RankedDuplicates, ScoredCandidate, AMBIGUOUS_TIE_RANK};
pub use reconciler::{reconcile, MergeSide, Reconciliation};
