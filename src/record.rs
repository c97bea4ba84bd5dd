//! Candidate Records
//!
//! One company's target disclosure under one profile, as read from the
//! normalized profile tables. Records are immutable once built; later stages
//! wrap them (see `ScoredCandidate`) instead of editing them.

use serde::{Deserialize, Serialize};

/// Number of parallel target slots carried by a profile 2 record
pub const TARGET_SLOTS: usize = 5;

/// Reporting profile of a record
///
/// Profile 3 (multiple targets over different scopes) is not processed;
/// any code other than 1, 2 or 4 is carried as `Other` and scores 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Profile {
    /// Profile 1: a single target in the reporting year
    SingleTarget,
    /// Profile 2: multiple sequential targets over the same scope
    SequentialTargets,
    /// Profile 4: none of the above, one scope/target-year combination chosen
    Unclassified,
    Other(i64),
}

impl Profile {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Profile::SingleTarget,
            2 => Profile::SequentialTargets,
            4 => Profile::Unclassified,
            other => Profile::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Profile::SingleTarget => 1,
            Profile::SequentialTargets => 2,
            Profile::Unclassified => 4,
            Profile::Other(code) => *code,
        }
    }
}

/// Emissions accounting method, derived once from the full scope label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountingMethod {
    LocationBased,
    MarketBased,
    /// Exactly "Scope 1": no scope 2 accounting choice involved
    Scope1Only,
    Unclassified,
}

impl AccountingMethod {
    /// Classify a full scope label such as "Scope 1+2 (location-based)"
    pub fn classify(full_scope: &str) -> Self {
        if full_scope.contains("location") {
            AccountingMethod::LocationBased
        } else if full_scope.contains("market") {
            AccountingMethod::MarketBased
        } else if full_scope == "Scope 1" {
            AccountingMethod::Scope1Only
        } else {
            AccountingMethod::Unclassified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountingMethod::LocationBased => "location_based",
            AccountingMethod::MarketBased => "market_based",
            AccountingMethod::Scope1Only => "scope_1_only",
            AccountingMethod::Unclassified => "unclassified",
        }
    }
}

/// One (target_year_i, target_id_i, target_status_i) slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSlot {
    pub target_year: Option<i32>,
    pub target_id: Option<String>,
    pub target_status: Option<String>,
}

impl TargetSlot {
    /// A slot counts towards `nr_targets` only when it holds a usable year
    pub fn is_populated(&self) -> bool {
        matches!(self.target_year, Some(year) if year > 0)
    }
}

/// A single candidate record for one company in one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub account_id: String,
    pub organization: Option<String>,
    pub profile: Profile,
    /// Full scope label, e.g. "Scope 2 (location-based)"
    pub scope: String,
    /// Coarse scope code, e.g. "S1S2"
    pub simple_scope: String,
    pub accounting_method: AccountingMethod,
    pub base_year: Option<i32>,
    pub emissions_base_year: Option<f64>,
    /// Share (0-100) of base-year emissions covered by the target
    pub emissions_base_year_percent: Option<f64>,
    pub targets: [TargetSlot; TARGET_SLOTS],
}

impl CandidateRecord {
    /// Build a record with a single target slot filled (profiles 1 and 4)
    pub fn new(
        account_id: impl Into<String>,
        profile: Profile,
        scope: impl Into<String>,
        simple_scope: impl Into<String>,
    ) -> Self {
        let scope = scope.into();
        Self {
            account_id: account_id.into(),
            organization: None,
            profile,
            accounting_method: AccountingMethod::classify(&scope),
            scope,
            simple_scope: simple_scope.into(),
            base_year: None,
            emissions_base_year: None,
            emissions_base_year_percent: None,
            targets: Default::default(),
        }
    }

    pub fn with_base_year(mut self, base_year: i32) -> Self {
        self.base_year = Some(base_year);
        self
    }

    pub fn with_coverage(mut self, percent: f64) -> Self {
        self.emissions_base_year_percent = Some(percent);
        self
    }

    pub fn with_target_years(mut self, years: &[i32]) -> Self {
        for (slot, year) in self.targets.iter_mut().zip(years) {
            slot.target_year = Some(*year);
        }
        self
    }

    /// Count of populated target-year slots (0 if none)
    pub fn nr_targets(&self) -> u32 {
        self.targets.iter().filter(|slot| slot.is_populated()).count() as u32
    }
}
