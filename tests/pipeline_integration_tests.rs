//! Pipeline Integration Tests
//!
//! Drives the whole year pipeline through in-memory profile tables and an
//! in-memory sink, checking the audit tables and the final table per year.

use polars::prelude::*;
use std::collections::HashSet;
use target_dedup_rust::{
    Diagnostic, MemoryProfileSource, MemoryTableSink, OutputTable, PipelineConfig, YearPipeline,
};

fn profile_table(
    ids: &[&str],
    scopes: &[&str],
    simple_scopes: &[&str],
    base_years: &[i64],
) -> DataFrame {
    let n = ids.len();
    df![
        "account_id" => ids,
        "organization" => ids.iter().map(|id| format!("Org {}", id)).collect::<Vec<_>>(),
        "scope" => scopes,
        "simple_scope" => simple_scopes,
        "base_year" => base_years,
        "emissions_base_year_percent" => vec![80.0; n],
        "target_year_1" => vec![2030i64; n],
        "target_id_1" => vec!["Abs 1"; n],
        "target_status_1" => vec!["Underway"; n],
    ]
    .unwrap()
}

const LOCATION: &str = "Scope 1+2 (location-based)";

/// 2021: A1 in all three profiles, B only in profile 1, C tied in profiles 1 and 4
fn source_2021() -> MemoryProfileSource {
    MemoryProfileSource::new()
        .with_frame(
            2021,
            1,
            profile_table(&["A1", "B", "C"], &[LOCATION; 3], &["S1", "S2", "S1S2"], &[2021, 2020, 2019]),
        )
        .with_frame(2021, 2, profile_table(&["A1"], &[LOCATION], &["S1S2"], &[2021]))
        .with_frame(
            2021,
            4,
            profile_table(&["A1", "C"], &[LOCATION; 2], &["S1S2S3", "S1S2"], &[2021, 2019]),
        )
}

fn config(years: Vec<i32>) -> PipelineConfig {
    PipelineConfig {
        years,
        ..PipelineConfig::default()
    }
}

fn str_values(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_year_tables_for_mixed_profiles() {
    let mut pipeline = YearPipeline::new(config(vec![2021]), source_2021(), MemoryTableSink::new());
    let summary = pipeline.run_all();
    assert!(summary.is_success());

    let sink = pipeline.into_sink();
    assert_eq!(sink.len(), OutputTable::ALL.len());

    let unioned = sink.get(2021, OutputTable::UnionedProfiles).unwrap();
    assert_eq!(unioned.height(), 6);

    let scored = sink.get(2021, OutputTable::Scored).unwrap();
    assert_eq!(scored.height(), 5);
    assert_eq!(str_values(scored, "account_id"), vec!["A1", "A1", "A1", "C", "C"]);

    // A1: profile 2 wins, the other two are removed
    let kept = sink.get(2021, OutputTable::KeptDuplicates).unwrap();
    assert_eq!(str_values(kept, "account_id"), vec!["A1", "C"]);
    let kept_profiles = kept.column("profile").unwrap().i64().unwrap();
    assert_eq!(kept_profiles.get(0), Some(2));

    // C: profile 1 outranks profile 4, so no tie
    assert_eq!(kept_profiles.get(1), Some(1));
    assert_eq!(sink.get(2021, OutputTable::Ambiguous).unwrap().height(), 0);
    assert_eq!(sink.get(2021, OutputTable::Removed).unwrap().height(), 3);

    let final_table = sink.get(2021, OutputTable::Final).unwrap();
    assert_eq!(str_values(final_table, "account_id"), vec!["B", "A1", "C"]);

    assert_eq!(sink.get(2021, OutputTable::MergeLeftOnly).unwrap().height(), 1);
    assert_eq!(sink.get(2021, OutputTable::MergeBoth).unwrap().height(), 5);
    assert_eq!(sink.get(2021, OutputTable::MergeRightOnly).unwrap().height(), 0);

    let year = &summary.years[0];
    assert_eq!(year.final_rows, 3);
    assert!(!year.suspect);
}

#[test]
fn test_final_account_ids_are_unique() {
    let mut pipeline = YearPipeline::new(config(vec![2021]), source_2021(), MemoryTableSink::new());
    pipeline.run_all();
    let sink = pipeline.into_sink();

    let ids = str_values(sink.get(2021, OutputTable::Final).unwrap(), "account_id");
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn test_year_without_duplicates() {
    let source = MemoryProfileSource::new()
        .with_frame(2019, 1, profile_table(&["A"], &[LOCATION], &["S1"], &[2018]))
        .with_frame(2019, 2, profile_table(&["B"], &[LOCATION], &["S1S2"], &[2018]))
        .with_frame(2019, 4, profile_table(&["C"], &[LOCATION], &["S2"], &[2018]));

    let mut pipeline = YearPipeline::new(config(vec![2019]), source, MemoryTableSink::new());
    let summary = pipeline.run_all();
    assert!(summary.is_success());
    let sink = pipeline.into_sink();

    for table in [OutputTable::Removed, OutputTable::Ambiguous, OutputTable::KeptDuplicates] {
        let df = sink.get(2019, table).unwrap();
        assert_eq!(df.height(), 0, "{:?} should be empty", table);
        assert!(df.column("rank").is_ok());
        assert!(df.column("score").is_ok());
    }

    let final_table = sink.get(2019, OutputTable::Final).unwrap();
    assert_eq!(str_values(final_table, "account_id"), vec!["A", "B", "C"]);
}

#[test]
fn test_missing_profile_fails_only_that_year() {
    let mut source = source_2021();
    // 2020 has no profile 4 table
    source.insert(2020, 1, profile_table(&["X"], &[LOCATION], &["S1"], &[2019]));
    source.insert(2020, 2, profile_table(&["X"], &[LOCATION], &["S1"], &[2019]));

    let mut pipeline = YearPipeline::new(config(vec![2020, 2021]), source, MemoryTableSink::new());
    let summary = pipeline.run_all();

    assert!(!summary.is_success());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].year, 2020);
    assert!(summary.failures[0].error.contains("profile 4"));

    assert_eq!(summary.years.len(), 1);
    assert_eq!(summary.years[0].year, 2021);
    let sink = pipeline.into_sink();
    assert!(sink.get(2020, OutputTable::Final).is_none());
    assert!(sink.get(2021, OutputTable::Final).is_some());
}

#[test]
fn test_unknown_scope_reported_with_fallback() {
    let source = MemoryProfileSource::new()
        .with_frame(2022, 1, profile_table(&["Q"], &[LOCATION], &["S4"], &[2020]))
        .with_frame(2022, 2, profile_table(&["Q"], &[LOCATION], &["S1"], &[2020]))
        .with_frame(2022, 4, profile_table(&["R"], &[LOCATION], &["S1"], &[2020]));

    let mut pipeline = YearPipeline::new(config(vec![2022]), source, MemoryTableSink::new());
    let summary = pipeline.run_all();

    let unknown: Vec<_> = summary
        .diagnostics
        .issues()
        .iter()
        .filter(|issue| matches!(&issue.diagnostic, Diagnostic::UnknownScopeCode { code, .. } if code == "S4"))
        .collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].year, 2022);

    let checks = summary.diagnostics.scope_checks(pipeline.calculator().scope_table());
    assert!(checks.iter().any(|c| c.code == "S4" && !c.known));

    let scored = pipeline.sink().get(2022, OutputTable::Scored).unwrap();
    let scope_digits = scored.column("priority_scope").unwrap().u32().unwrap();
    assert_eq!(scope_digits.get(0), Some(9));
}

#[test]
fn test_rerun_is_identical() {
    let run = || {
        let mut pipeline = YearPipeline::new(config(vec![2021]), source_2021(), MemoryTableSink::new());
        pipeline.run_all();
        pipeline.into_sink()
    };
    let first = run();
    let second = run();

    for table in OutputTable::ALL {
        let a = first.get(2021, table).unwrap();
        let b = second.get(2021, table).unwrap();
        assert!(a.equals_missing(b), "{:?} differs between runs", table);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let mut source = source_2021();
    source.insert(2022, 1, profile_table(&["A", "A"], &[LOCATION; 2], &["S1", "S2"], &[2019, 2021]));
    source.insert(2022, 2, profile_table(&["B"], &[LOCATION], &["S1"], &[2019]));
    source.insert(2022, 4, profile_table(&["B"], &["Scope 2 (market-based)"], &["S1"], &[2019]));

    let run = |parallel: bool, source: MemoryProfileSource| {
        let config = PipelineConfig {
            parallel,
            ..config(vec![2021, 2022])
        };
        let mut pipeline = YearPipeline::new(config, source, MemoryTableSink::new());
        let summary = pipeline.run_all();
        (summary, pipeline.into_sink())
    };

    let mut source_copy = source_2021();
    source_copy.insert(2022, 1, profile_table(&["A", "A"], &[LOCATION; 2], &["S1", "S2"], &[2019, 2021]));
    source_copy.insert(2022, 2, profile_table(&["B"], &[LOCATION], &["S1"], &[2019]));
    source_copy.insert(2022, 4, profile_table(&["B"], &["Scope 2 (market-based)"], &["S1"], &[2019]));

    let (seq_summary, seq_sink) = run(false, source);
    let (par_summary, par_sink) = run(true, source_copy);

    assert_eq!(seq_summary.years, par_summary.years);
    for year in [2021, 2022] {
        let a = seq_sink.get(year, OutputTable::Final).unwrap();
        let b = par_sink.get(year, OutputTable::Final).unwrap();
        assert!(a.equals_missing(b));
    }
}
