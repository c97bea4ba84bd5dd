//! Year Pipeline - main coordinator for duplicate resolution
//!
//! For each configured year:
//! 1. load every profile table and union them (fatal for the year on error)
//! 2. group duplicates by account id
//! 3. score and rank each duplicate group
//! 4. reconcile kept duplicates with the singletons
//! 5. write the audit tables and the final table
//!
//! Step 2-4 (`resolve_year`) is pure and independent per year, so loaded
//! years can be resolved on the rayon pool when `parallel` is set.

use crate::config::PipelineConfig;
use crate::data::{load_year, ProfileSource};
use crate::dedup::{
    group_duplicates, rank_duplicates, reconcile, DuplicatePartition, MergeSide, RankedDuplicates,
    Reconciliation, ScoredCandidate,
};
use crate::diagnostics::{Diagnostic, DiagnosticsContext};
use crate::output::{merge_frame, records_frame, scored_frame, OutputTable, TableSink};
use crate::record::CandidateRecord;
use crate::scoring::ScoreCalculator;
use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;

/// Everything decided for one year
#[derive(Debug, Clone)]
pub struct YearResolution {
    pub year: i32,
    pub unioned: Vec<CandidateRecord>,
    pub partition: DuplicatePartition,
    pub ranked: RankedDuplicates,
    pub reconciliation: Reconciliation,
    pub diagnostics: DiagnosticsContext,
}

impl YearResolution {
    pub fn summary(&self) -> YearSummary {
        YearSummary {
            year: self.year,
            unioned: self.unioned.len(),
            singletons: self.partition.singletons.len(),
            duplicate_groups: self.partition.groups.len(),
            duplicate_records: self.partition.duplicate_count(),
            kept: self.ranked.kept().len(),
            removed: self.ranked.removed().len(),
            ambiguous: self.ranked.ambiguous().len(),
            final_rows: self.reconciliation.final_records.len(),
            diagnostics: self.diagnostics.issues().len(),
            suspect: self.diagnostics.has_integrity_issues(),
        }
    }
}

/// Row counts reported for a year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub unioned: usize,
    pub singletons: usize,
    pub duplicate_groups: usize,
    pub duplicate_records: usize,
    pub kept: usize,
    pub removed: usize,
    pub ambiguous: usize,
    pub final_rows: usize,
    pub diagnostics: usize,
    /// Merge checks failed; downstream should not trust this year
    pub suspect: bool,
}

/// A year that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct YearFailure {
    pub year: i32,
    pub error: String,
}

/// Result of running every configured year
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub years: Vec<YearSummary>,
    pub failures: Vec<YearFailure>,
    pub diagnostics: DiagnosticsContext,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Group, rank and reconcile one year's unioned records
pub fn resolve_year(year: i32, unioned: Vec<CandidateRecord>, calculator: &ScoreCalculator) -> YearResolution {
    let mut diagnostics = DiagnosticsContext::new();
    for record in &unioned {
        diagnostics.observe_scope(&record.scope, &record.simple_scope);
    }

    let partition = group_duplicates(&unioned);
    tracing::info!(
        year,
        "{} records: {} singletons, {} duplicate groups ({} records)",
        unioned.len(),
        partition.singletons.len(),
        partition.groups.len(),
        partition.duplicate_count()
    );

    let ranked = rank_duplicates(&partition, calculator, year, &mut diagnostics);

    let kept = ranked.kept();
    let reconciliation = reconcile(&unioned, &kept, partition.singletons.len());
    for issue in &reconciliation.issues {
        diagnostics.report(year, Diagnostic::MergeInconsistency(issue.clone()));
    }

    tracing::info!(
        year,
        "Number of rows: {} in non-duplicates, {} in duplicates, and {} in final dataframe",
        reconciliation.left_only.len(),
        kept.len(),
        reconciliation.final_records.len()
    );

    YearResolution {
        year,
        unioned,
        partition,
        ranked,
        reconciliation,
        diagnostics,
    }
}

/// Runs the configured years against a profile source and a table sink
pub struct YearPipeline<S, W> {
    config: PipelineConfig,
    calculator: ScoreCalculator,
    source: S,
    sink: W,
}

impl<S: ProfileSource, W: TableSink> YearPipeline<S, W> {
    pub fn new(config: PipelineConfig, source: S, sink: W) -> Self {
        Self {
            config,
            calculator: ScoreCalculator::default(),
            source,
            sink,
        }
    }

    pub fn with_calculator(mut self, calculator: ScoreCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn calculator(&self) -> &ScoreCalculator {
        &self.calculator
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Load, resolve and write a single year
    pub fn run_year(&mut self, year: i32) -> Result<YearResolution> {
        let unioned = load_year(&self.source, year, &self.config.profiles)?;
        let resolution = resolve_year(year, unioned, &self.calculator);
        self.write_year(&resolution)?;
        Ok(resolution)
    }

    /// Run every configured year; a failing year does not stop the others
    pub fn run_all(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();

        let mut loaded = Vec::new();
        for &year in &self.config.years {
            match load_year(&self.source, year, &self.config.profiles) {
                Ok(unioned) => loaded.push((year, unioned)),
                Err(e) => {
                    tracing::error!(year, "Year failed: {:#}", e);
                    summary.failures.push(YearFailure { year, error: format!("{:#}", e) });
                }
            }
        }

        let calculator = &self.calculator;
        let resolutions: Vec<YearResolution> = if self.config.parallel {
            loaded
                .into_par_iter()
                .map(|(year, unioned)| resolve_year(year, unioned, calculator))
                .collect()
        } else {
            loaded
                .into_iter()
                .map(|(year, unioned)| resolve_year(year, unioned, calculator))
                .collect()
        };

        for resolution in resolutions {
            match self.write_year(&resolution) {
                Ok(()) => {
                    summary.years.push(resolution.summary());
                    summary.diagnostics.merge(resolution.diagnostics);
                }
                Err(e) => {
                    tracing::error!(year = resolution.year, "Writing year failed: {:#}", e);
                    summary.failures.push(YearFailure {
                        year: resolution.year,
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        summary.failures.sort_by_key(|f| f.year);
        summary
    }

    fn write_year(&mut self, resolution: &YearResolution) -> Result<()> {
        let year = resolution.year;
        let ranked = &resolution.ranked;
        let merge = &resolution.reconciliation;

        let mut duplicates: Vec<&CandidateRecord> = resolution.partition.duplicate_records().collect();
        duplicates.sort_by(|a, b| a.account_id.cmp(&b.account_id));

        let all_scored: Vec<&ScoredCandidate> = ranked.scored.iter().collect();

        let tables = [
            (OutputTable::UnionedProfiles, records_frame(&resolution.unioned)?),
            (OutputTable::DuplicateCheck, records_frame(duplicates)?),
            (OutputTable::Scored, scored_frame(&all_scored)?),
            (OutputTable::Removed, scored_frame(&ranked.removed())?),
            (OutputTable::Ambiguous, scored_frame(&ranked.ambiguous())?),
            (OutputTable::KeptDuplicates, scored_frame(&ranked.kept())?),
            (OutputTable::MergeLeftOnly, merge_frame(&merge.left_only, MergeSide::LeftOnly)?),
            (OutputTable::MergeBoth, merge_frame(&merge.both, MergeSide::Both)?),
            (OutputTable::MergeRightOnly, merge_frame(&merge.right_only, MergeSide::RightOnly)?),
            (OutputTable::Final, records_frame(&merge.final_records)?),
        ];

        for (table, mut df) in tables {
            self.sink.write(year, table, &mut df)?;
        }

        if !merge.right_only.is_empty() {
            tracing::warn!(
                year,
                "For year {} some records appear both in the dataframe without duplicates and the duplicates dataframe",
                year
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Profile;

    fn record(id: &str, profile: i64, simple_scope: &str) -> CandidateRecord {
        CandidateRecord::new(id, Profile::from_code(profile), "Scope 1+2 (location-based)", simple_scope)
            .with_base_year(2021)
            .with_coverage(80.0)
            .with_target_years(&[2030])
    }

    #[test]
    fn test_resolve_year_counts() {
        let unioned = vec![
            record("A1", 2, "S1S2"),
            record("A1", 1, "S1"),
            record("A1", 4, "S1S2S3"),
            record("B", 1, "S2"),
        ];
        let resolution = resolve_year(2021, unioned, &ScoreCalculator::default());
        let summary = resolution.summary();

        assert_eq!(summary.singletons, 1);
        assert_eq!(summary.duplicate_groups, 1);
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.removed, 2);
        assert_eq!(summary.final_rows, 2);
        assert!(!summary.suspect);
        assert_eq!(resolution.diagnostics.simple_scopes_seen().len(), 4);
    }

    #[test]
    fn test_resolve_year_is_deterministic() {
        let unioned = vec![
            record("C", 1, "S1"),
            record("A", 1, "S1"),
            record("C", 1, "S1"),
            record("A", 2, "S2"),
        ];
        let first = resolve_year(2020, unioned.clone(), &ScoreCalculator::default());
        let second = resolve_year(2020, unioned, &ScoreCalculator::default());

        assert_eq!(first.ranked, second.ranked);
        assert_eq!(first.reconciliation.final_records, second.reconciliation.final_records);
    }
}
