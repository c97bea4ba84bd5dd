//! Resolve duplicate target records for every configured year
//!
//! Reads the per-profile tables of each year, keeps one record per company
//! and writes the audit tables plus the final per-year table.
//!
//! Usage:
//!   PIPELINE_CONFIG=config.json cargo run --release --bin process_duplicates
//!
//! Environment:
//!   PIPELINE_CONFIG  JSON config file (default: built-in defaults)
//!   DATA_DIR         overrides `data_dir` from the config
//!   RUST_LOG         log filter (default: target_dedup_rust=info,warn)

use target_dedup_rust::{CsvProfileSource, CsvTableSink, PipelineConfig, YearPipeline};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "target_dedup_rust=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match std::env::var("PIPELINE_CONFIG") {
        Ok(path) => PipelineConfig::load(&PathBuf::from(path))?,
        Err(_) => PipelineConfig::default(),
    };
    if let Ok(data_dir) = std::env::var("DATA_DIR") {
        config.data_dir = PathBuf::from(data_dir);
    }
    config.validate()?;

    println!("\n{}", "=".repeat(70));
    println!("Duplicate Target Resolution");
    println!("{}", "=".repeat(70));
    println!("  Data dir: {:?}", config.data_dir);
    println!("  Years:    {:?}", config.years);
    println!("  Profiles: {:?}", config.profiles);
    println!("  Parallel: {}", config.parallel);
    println!();

    let start = Instant::now();
    let source = CsvProfileSource::new(&config);
    let sink = CsvTableSink::new(&config);
    let mut pipeline = YearPipeline::new(config.clone(), source, sink);
    let summary = pipeline.run_all();

    println!("{}", "-".repeat(70));
    for year in &summary.years {
        println!(
            "{}: {} rows in non-duplicates, {} in duplicates, and {} in final dataframe{}",
            year.year,
            year.singletons,
            year.kept,
            year.final_rows,
            if year.suspect { "  [SUSPECT]" } else { "" }
        );
        println!(
            "      {} groups, {} removed, {} ambiguous, {} diagnostics",
            year.duplicate_groups, year.removed, year.ambiguous, year.diagnostics
        );
    }
    for failure in &summary.failures {
        println!("{}: FAILED - {}", failure.year, failure.error);
    }

    println!("{}", "-".repeat(70));
    println!("Simple scopes:");
    for check in summary.diagnostics.scope_checks(pipeline.calculator().scope_table()) {
        if check.known {
            println!("  OK {} in known list of simple scopes", check.code);
        } else {
            println!("  CHECK {} is not known yet, check data or add to definitions", check.code);
        }
    }

    let summary_path = config.check_path().join("run_summary.json");
    std::fs::create_dir_all(config.check_path())?;
    std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;

    println!("{}", "=".repeat(70));
    println!("Total time: {:.3} s", start.elapsed().as_secs_f64());
    println!("Summary written to {:?}", summary_path);
    println!("{}", "=".repeat(70));

    if !summary.is_success() {
        anyhow::bail!("{} year(s) failed", summary.failures.len());
    }

    Ok(())
}
