//! Pipeline Configuration
//!
//! Loaded from a JSON file; every field has a default so a partial file (or
//! no file at all) works.
//!
//! ```json
//! {
//!   "data_dir": "data/2023",
//!   "years": [2021, 2022],
//!   "parallel": true
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Profiles the scorer knows how to rank
pub const SUPPORTED_PROFILES: [i64; 3] = [1, 2, 4];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the data tree
    pub data_dir: PathBuf,
    /// Profile tables, relative to `data_dir`
    pub input_dir: PathBuf,
    /// Audit tables, relative to `data_dir`
    pub check_dir: PathBuf,
    /// Final per-year tables, relative to `data_dir`
    pub output_dir: PathBuf,
    pub years: Vec<i32>,
    /// Load order of the profile tables within a year
    pub profiles: Vec<i64>,
    /// File name with `{year}` and `{profile}` placeholders
    pub input_pattern: String,
    /// File name with a `{year}` placeholder
    pub final_pattern: String,
    pub separator: char,
    /// Resolve loaded years on the rayon pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            input_dir: PathBuf::from("input"),
            check_dir: PathBuf::from("processed/check"),
            output_dir: PathBuf::from("processed"),
            years: vec![2018, 2019, 2020, 2021, 2022],
            profiles: SUPPORTED_PROFILES.to_vec(),
            input_pattern: "abs_er_{year}_prof{profile}.csv".to_string(),
            final_pattern: "abs_er_{year}_final.csv".to_string(),
            separator: ';',
            parallel: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: PipelineConfig = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            anyhow::bail!("Config lists no years to process");
        }
        if self.profiles.is_empty() {
            anyhow::bail!("Config lists no profiles to load");
        }
        if let Some(profile) = self.profiles.iter().find(|p| !SUPPORTED_PROFILES.contains(p)) {
            anyhow::bail!(
                "Profile {} is not supported (expected one of {:?})",
                profile, SUPPORTED_PROFILES
            );
        }
        if !self.input_pattern.contains("{year}") || !self.input_pattern.contains("{profile}") {
            anyhow::bail!("input_pattern '{}' needs {{year}} and {{profile}}", self.input_pattern);
        }
        if !self.final_pattern.contains("{year}") {
            anyhow::bail!("final_pattern '{}' needs {{year}}", self.final_pattern);
        }
        if !self.separator.is_ascii() {
            anyhow::bail!("separator '{}' must be a single ASCII character", self.separator);
        }
        Ok(())
    }

    pub fn input_path(&self) -> PathBuf {
        self.data_dir.join(&self.input_dir)
    }

    pub fn check_path(&self) -> PathBuf {
        self.data_dir.join(&self.check_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_dir)
    }

    pub fn final_file_name(&self, year: i32) -> String {
        self.final_pattern.replace("{year}", &year.to_string())
    }

    pub fn separator_byte(&self) -> u8 {
        if self.separator.is_ascii() {
            self.separator as u8
        } else {
            b';'
        }
    }
}
