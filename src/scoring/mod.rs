//! Priority scoring for duplicate candidates
//!
//! - `scope_priority`: fixed simple-scope priority table
//! - `calculator`: composite ordering key (one digit per criterion)

pub mod scope_priority;
pub mod calculator;

pub use scope_priority::{PriorityLookup, ScopePriorityTable};
pub use calculator::{ScoreCalculator, ScoreDigits, ScoreInput, ScoreOutcome};
