//! Output Tables
//!
//! Builds the per-year audit and final tables as polars frames and hands
//! them to a `TableSink`. Every table is built from the known schema, so an
//! empty table still carries all of its columns.

use crate::config::PipelineConfig;
use crate::data::{TARGET_ID_COLUMNS, TARGET_STATUS_COLUMNS, TARGET_YEAR_COLUMNS};
use crate::dedup::{MergeSide, ScoredCandidate};
use crate::record::{CandidateRecord, TARGET_SLOTS};
use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Tables produced for each year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputTable {
    /// All profiles of the year, unioned
    UnionedProfiles,
    /// Every row whose account appears more than once, by account id
    DuplicateCheck,
    /// Duplicates with score, score digits and rank columns
    Scored,
    /// rank > 1.5
    Removed,
    /// avg_rank == 1.5
    Ambiguous,
    /// rank == 1
    KeptDuplicates,
    MergeLeftOnly,
    MergeBoth,
    MergeRightOnly,
    /// Singletons plus kept duplicates
    Final,
}

impl OutputTable {
    pub const ALL: [OutputTable; 10] = [
        OutputTable::UnionedProfiles,
        OutputTable::DuplicateCheck,
        OutputTable::Scored,
        OutputTable::Removed,
        OutputTable::Ambiguous,
        OutputTable::KeptDuplicates,
        OutputTable::MergeLeftOnly,
        OutputTable::MergeBoth,
        OutputTable::MergeRightOnly,
        OutputTable::Final,
    ];

    /// File stem for the audit tables; the final table is named by config
    pub fn audit_file_name(&self, year: i32) -> Option<String> {
        let stem = match self {
            OutputTable::UnionedProfiles => "df_profile",
            OutputTable::DuplicateCheck => "duplicates_profile",
            OutputTable::Scored => "duplicates_profiles_criteria",
            OutputTable::Removed => "duplicates_removed",
            OutputTable::Ambiguous => "duplicates_nochoice",
            OutputTable::KeptDuplicates => "duplicates",
            OutputTable::MergeLeftOnly => "check_left",
            OutputTable::MergeBoth => "check_both",
            OutputTable::MergeRightOnly => "check_right",
            OutputTable::Final => return None,
        };
        Some(format!("{}_{}.csv", stem, year))
    }
}

/// Destination of per-year tables
pub trait TableSink {
    fn write(&mut self, year: i32, table: OutputTable, df: &mut DataFrame) -> Result<()>;
}

/// Writes audit tables under the check directory and the final table under
/// the output directory
pub struct CsvTableSink {
    check_dir: PathBuf,
    output_dir: PathBuf,
    final_pattern: String,
    separator: u8,
}

impl CsvTableSink {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            check_dir: config.check_path(),
            output_dir: config.output_path(),
            final_pattern: config.final_pattern.clone(),
            separator: config.separator_byte(),
        }
    }

    pub fn path_for(&self, year: i32, table: OutputTable) -> PathBuf {
        match table.audit_file_name(year) {
            Some(name) => self.check_dir.join(name),
            None => self
                .output_dir
                .join(self.final_pattern.replace("{year}", &year.to_string())),
        }
    }
}

impl TableSink for CsvTableSink {
    fn write(&mut self, year: i32, table: OutputTable, df: &mut DataFrame) -> Result<()> {
        let path = self.path_for(year, table);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }

        let mut file = fs::File::create(&path)
            .with_context(|| format!("Failed to create output file: {:?}", path))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(self.separator)
            .finish(df)
            .with_context(|| format!("Failed to write {:?}", path))?;

        tracing::debug!("Wrote {} rows to {:?}", df.height(), path);
        Ok(())
    }
}

/// Keeps every written table in memory
#[derive(Default)]
pub struct MemoryTableSink {
    tables: BTreeMap<(i32, OutputTable), DataFrame>,
}

impl MemoryTableSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, year: i32, table: OutputTable) -> Option<&DataFrame> {
        self.tables.get(&(year, table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableSink for MemoryTableSink {
    fn write(&mut self, year: i32, table: OutputTable, df: &mut DataFrame) -> Result<()> {
        self.tables.insert((year, table), df.clone());
        Ok(())
    }
}

fn column<T, Phantom: ?Sized>(name: &str, values: T) -> Column
where
    Series: NamedFrom<T, Phantom>,
{
    Series::new(name.into(), values).into()
}

/// Columns of the normalized record schema, plus `profile`
fn record_columns(records: &[&CandidateRecord]) -> Vec<Column> {
    let mut columns = vec![
        column("account_id", records.iter().map(|r| r.account_id.as_str()).collect::<Vec<_>>()),
        column("organization", records.iter().map(|r| r.organization.as_deref()).collect::<Vec<_>>()),
        column("profile", records.iter().map(|r| r.profile.code()).collect::<Vec<i64>>()),
        column("scope", records.iter().map(|r| r.scope.as_str()).collect::<Vec<_>>()),
        column("simple_scope", records.iter().map(|r| r.simple_scope.as_str()).collect::<Vec<_>>()),
        column("base_year", records.iter().map(|r| r.base_year).collect::<Vec<Option<i32>>>()),
        column(
            "emissions_base_year",
            records.iter().map(|r| r.emissions_base_year).collect::<Vec<Option<f64>>>(),
        ),
        column(
            "emissions_base_year_percent",
            records.iter().map(|r| r.emissions_base_year_percent).collect::<Vec<Option<f64>>>(),
        ),
    ];

    for slot in 0..TARGET_SLOTS {
        columns.push(column(
            TARGET_YEAR_COLUMNS[slot],
            records.iter().map(|r| r.targets[slot].target_year).collect::<Vec<Option<i32>>>(),
        ));
        columns.push(column(
            TARGET_ID_COLUMNS[slot],
            records.iter().map(|r| r.targets[slot].target_id.as_deref()).collect::<Vec<_>>(),
        ));
        columns.push(column(
            TARGET_STATUS_COLUMNS[slot],
            records.iter().map(|r| r.targets[slot].target_status.as_deref()).collect::<Vec<_>>(),
        ));
    }

    columns
}

pub fn records_frame<'a, I>(records: I) -> Result<DataFrame>
where
    I: IntoIterator<Item = &'a CandidateRecord>,
{
    let records: Vec<&CandidateRecord> = records.into_iter().collect();
    DataFrame::new(record_columns(&records)).context("Failed to build record table")
}

/// Record columns followed by the join side of each row
pub fn merge_frame(records: &[CandidateRecord], side: MergeSide) -> Result<DataFrame> {
    let refs: Vec<&CandidateRecord> = records.iter().collect();
    let mut columns = record_columns(&refs);
    columns.push(column("merge_side", vec![side.as_str(); refs.len()]));
    DataFrame::new(columns).context("Failed to build merge check table")
}

/// Record columns followed by scoring and rank columns
pub fn scored_frame(candidates: &[&ScoredCandidate]) -> Result<DataFrame> {
    let records: Vec<&CandidateRecord> = candidates.iter().map(|c| &c.record).collect();
    let mut columns = record_columns(&records);

    let digit = |f: fn(&ScoredCandidate) -> u8| -> Vec<u32> {
        candidates.iter().map(|c| u32::from(f(c))).collect()
    };

    columns.extend([
        column(
            "accounting_method",
            candidates.iter().map(|c| c.record.accounting_method.as_str()).collect::<Vec<_>>(),
        ),
        column("nr_targets", candidates.iter().map(|c| c.nr_targets).collect::<Vec<u32>>()),
        column("priority_profile", digit(|c| c.digits.profile)),
        column("priority_scope", digit(|c| c.digits.scope)),
        column("priority_method", digit(|c| c.digits.method)),
        column("priority_targets", digit(|c| c.digits.targets)),
        column("priority_coverage", digit(|c| c.digits.coverage)),
        column("score", candidates.iter().map(|c| c.score).collect::<Vec<f64>>()),
        column("avg_rank", candidates.iter().map(|c| c.avg_rank).collect::<Vec<f64>>()),
        column("min_rank", candidates.iter().map(|c| c.min_rank).collect::<Vec<u32>>()),
        column("max_rank", candidates.iter().map(|c| c.max_rank).collect::<Vec<u32>>()),
        column("rank", candidates.iter().map(|c| c.rank).collect::<Vec<u32>>()),
        column("outcome", candidates.iter().map(|c| c.outcome().as_str()).collect::<Vec<_>>()),
    ]);

    DataFrame::new(columns).context("Failed to build scored table")
}
