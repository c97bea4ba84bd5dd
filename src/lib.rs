//! Emissions-Target Duplicate Resolution
//!
//! Picks one record per company per year out of several reporting-profile
//! datasets, keeping an audit trail of every decision.
//!
//! Pipeline per year:
//! - `data/`: load and union the normalized profile tables (Polars)
//! - `dedup/`: group duplicates, score and rank candidates, reconcile
//! - `scoring/`: scope priority table and composite score
//! - `output/`: audit and final tables
//! - `pipeline/`: per-year orchestration over the I/O collaborators

pub mod config;
pub mod data;
pub mod dedup;
pub mod diagnostics;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod scoring;
pub mod utils;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use data::{CsvProfileSource, MemoryProfileSource, ProfileSource};
pub use dedup::{Outcome, ScoredCandidate};
pub use diagnostics::{Diagnostic, DiagnosticsContext, MergeIssue};
pub use output::{CsvTableSink, MemoryTableSink, OutputTable, TableSink};
pub use pipeline::{resolve_year, RunSummary, YearPipeline, YearResolution, YearSummary};
pub use record::{AccountingMethod, CandidateRecord, Profile, TargetSlot};
pub use scoring::{ScoreCalculator, ScopePriorityTable};
