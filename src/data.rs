//! Profile Table Loading
//!
//! Turns one normalized profile table (one year, one profile) into typed
//! `CandidateRecord`s, and unions the profiles of a year in load order.
//!
//! Where the tables come from is a collaborator concern: `ProfileSource`
//! is implemented for `;`-separated CSV exports and for in-memory frames.

use crate::config::PipelineConfig;
use crate::record::{AccountingMethod, CandidateRecord, Profile, TargetSlot, TARGET_SLOTS};
use crate::utils::lazy_helpers::{project_schema, ColumnSpec};
use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

pub const TARGET_YEAR_COLUMNS: [&str; TARGET_SLOTS] = [
    "target_year_1", "target_year_2", "target_year_3", "target_year_4", "target_year_5",
];
pub const TARGET_ID_COLUMNS: [&str; TARGET_SLOTS] = [
    "target_id_1", "target_id_2", "target_id_3", "target_id_4", "target_id_5",
];
pub const TARGET_STATUS_COLUMNS: [&str; TARGET_SLOTS] = [
    "target_status_1", "target_status_2", "target_status_3", "target_status_4", "target_status_5",
];

/// Known columns of a normalized profile table
pub fn profile_schema() -> Vec<ColumnSpec> {
    let mut schema = vec![
        ColumnSpec::required("account_id", DataType::String),
        ColumnSpec::optional("organization", DataType::String),
        ColumnSpec::required("scope", DataType::String),
        ColumnSpec::required("simple_scope", DataType::String),
        ColumnSpec::required("base_year", DataType::Int32),
        ColumnSpec::optional("emissions_base_year", DataType::Float64),
        ColumnSpec::required("emissions_base_year_percent", DataType::Float64),
    ];
    for slot in 0..TARGET_SLOTS {
        // Profiles 1 and 4 only carry the first slot
        if slot == 0 {
            schema.push(ColumnSpec::required(TARGET_YEAR_COLUMNS[slot], DataType::Int32));
        } else {
            schema.push(ColumnSpec::optional(TARGET_YEAR_COLUMNS[slot], DataType::Int32));
        }
        schema.push(ColumnSpec::optional(TARGET_ID_COLUMNS[slot], DataType::String));
        schema.push(ColumnSpec::optional(TARGET_STATUS_COLUMNS[slot], DataType::String));
    }
    schema
}

/// Source of per-year, per-profile tables
pub trait ProfileSource {
    fn load(&self, year: i32, profile: i64) -> Result<DataFrame>;
}

/// Reads `<data_dir>/<input_dir>/<input_pattern>` CSV files
pub struct CsvProfileSource {
    input_dir: PathBuf,
    input_pattern: String,
    separator: u8,
}

impl CsvProfileSource {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            input_dir: config.input_path(),
            input_pattern: config.input_pattern.clone(),
            separator: config.separator_byte(),
        }
    }

    pub fn path_for(&self, year: i32, profile: i64) -> PathBuf {
        let file_name = self
            .input_pattern
            .replace("{year}", &year.to_string())
            .replace("{profile}", &profile.to_string());
        self.input_dir.join(file_name)
    }
}

impl ProfileSource for CsvProfileSource {
    fn load(&self, year: i32, profile: i64) -> Result<DataFrame> {
        let path = self.path_for(year, profile);
        if !path.exists() {
            anyhow::bail!(
                "Input file for year {} profile {} not found: {:?}",
                year, profile, path
            );
        }
        read_csv(&path, self.separator)
    }
}

fn read_csv(path: &Path, separator: u8) -> Result<DataFrame> {
    let parse_options = CsvParseOptions::default()
        .with_separator(separator)
        .with_null_values(Some(NullValues::AllColumnsSingle("NA".into())));

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None) // Scan entire file
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.into()))
        .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
        .finish()
        .with_context(|| format!("Failed to load profile CSV: {:?}", path))
}

/// Serves frames registered in memory; a missing entry behaves like a
/// missing input file
#[derive(Default)]
pub struct MemoryProfileSource {
    frames: FxHashMap<(i32, i64), DataFrame>,
}

impl MemoryProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: i32, profile: i64, frame: DataFrame) {
        self.frames.insert((year, profile), frame);
    }

    pub fn with_frame(mut self, year: i32, profile: i64, frame: DataFrame) -> Self {
        self.insert(year, profile, frame);
        self
    }
}

impl ProfileSource for MemoryProfileSource {
    fn load(&self, year: i32, profile: i64) -> Result<DataFrame> {
        self.frames
            .get(&(year, profile))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No table registered for year {} profile {}", year, profile))
    }
}

/// Convert one normalized profile table into candidate records
///
/// Rows without an `account_id` cannot be grouped and are skipped.
pub fn records_from_frame(df: &DataFrame, profile: Profile, context: &str) -> Result<Vec<CandidateRecord>> {
    let projected = project_schema(df, &profile_schema(), context)?;

    let account_id = projected.column("account_id")?.str()?;
    let organization = projected.column("organization")?.str()?;
    let scope = projected.column("scope")?.str()?;
    let simple_scope = projected.column("simple_scope")?.str()?;
    let base_year = projected.column("base_year")?.i32()?;
    let emissions_base_year = projected.column("emissions_base_year")?.f64()?;
    let coverage = projected.column("emissions_base_year_percent")?.f64()?;

    let mut target_years = Vec::with_capacity(TARGET_SLOTS);
    let mut target_ids = Vec::with_capacity(TARGET_SLOTS);
    let mut target_statuses = Vec::with_capacity(TARGET_SLOTS);
    for slot in 0..TARGET_SLOTS {
        target_years.push(projected.column(TARGET_YEAR_COLUMNS[slot])?.i32()?);
        target_ids.push(projected.column(TARGET_ID_COLUMNS[slot])?.str()?);
        target_statuses.push(projected.column(TARGET_STATUS_COLUMNS[slot])?.str()?);
    }

    let mut records = Vec::with_capacity(projected.height());
    let mut skipped = 0usize;

    for idx in 0..projected.height() {
        let Some(id) = account_id.get(idx) else {
            skipped += 1;
            continue;
        };

        let full_scope = scope.get(idx).unwrap_or_default().to_string();
        let mut targets: [TargetSlot; TARGET_SLOTS] = Default::default();
        for (slot, target) in targets.iter_mut().enumerate() {
            *target = TargetSlot {
                target_year: target_years[slot].get(idx),
                target_id: target_ids[slot].get(idx).map(str::to_string),
                target_status: target_statuses[slot].get(idx).map(str::to_string),
            };
        }

        records.push(CandidateRecord {
            account_id: id.to_string(),
            organization: organization.get(idx).map(str::to_string),
            profile,
            accounting_method: AccountingMethod::classify(&full_scope),
            scope: full_scope,
            simple_scope: simple_scope.get(idx).unwrap_or_default().to_string(),
            base_year: base_year.get(idx),
            emissions_base_year: emissions_base_year.get(idx),
            emissions_base_year_percent: coverage.get(idx),
            targets,
        });
    }

    if skipped > 0 {
        tracing::warn!("{}: skipped {} rows without account_id", context, skipped);
    }

    Ok(records)
}

/// Load every profile of a year and union them in profile order
///
/// Any missing table or required column fails the whole year.
pub fn load_year<S: ProfileSource + ?Sized>(
    source: &S,
    year: i32,
    profiles: &[i64],
) -> Result<Vec<CandidateRecord>> {
    let mut unioned = Vec::new();

    for &profile in profiles {
        let context = format!("year {} profile {}", year, profile);
        let frame = source
            .load(year, profile)
            .with_context(|| format!("Failed to load {}", context))?;
        let records = records_from_frame(&frame, Profile::from_code(profile), &context)?;
        tracing::info!("{}: {} records", context, records.len());
        unioned.extend(records);
    }

    Ok(unioned)
}
