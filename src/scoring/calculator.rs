//! Composite Priority Score
//!
//! Each criterion contributes one decimal digit, most significant first:
//!
//! ```text
//! score = 10^4 * profile + 10^3 * scope + 10^2 * method + 10 * targets + coverage
//!       + base_year / 2030
//! ```
//!
//! 1. profile: 2 → 9, 1 → 8, 4 → 7, other → 0
//! 2. simple scope: `ScopePriorityTable`, unknown → 9
//! 3. accounting method: location 9, market 8, plain "Scope 1" 7, else 0
//! 4. number of targets: `10 - n` for n in 1..=9, else 9
//! 5. coverage of base-year emissions: `floor(0.9 * percent / 10)`
//! 6. base year as a fraction, so more recent base years win remaining ties
//!
//! The calculator never fails: every out-of-range branch substitutes a
//! fallback digit and returns a diagnostic alongside the score.

use crate::diagnostics::Diagnostic;
use crate::record::{AccountingMethod, CandidateRecord, Profile};
use crate::scoring::scope_priority::{PriorityLookup, ScopePriorityTable};
use serde::Serialize;
use smallvec::SmallVec;

/// Divisor turning the base year into a fractional tiebreak
pub const BASE_YEAR_DIVISOR: f64 = 2030.0;

const TARGET_COUNT_FALLBACK: u8 = 9;
const METHOD_FALLBACK: u8 = 0;

/// Inputs to one score computation
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    /// Context for diagnostics only
    pub account_id: &'a str,
    pub profile: Profile,
    pub full_scope: &'a str,
    pub accounting_method: AccountingMethod,
    pub simple_scope: &'a str,
    pub coverage_percent: Option<f64>,
    pub base_year: Option<i32>,
    pub target_count: u32,
}

impl<'a> ScoreInput<'a> {
    pub fn from_record(record: &'a CandidateRecord, target_count: u32) -> Self {
        Self {
            account_id: &record.account_id,
            profile: record.profile,
            full_scope: &record.scope,
            accounting_method: record.accounting_method,
            simple_scope: &record.simple_scope,
            coverage_percent: record.emissions_base_year_percent,
            base_year: record.base_year,
            target_count,
        }
    }
}

/// Per-criterion digits behind a score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreDigits {
    pub profile: u8,
    pub scope: u8,
    pub method: u8,
    pub targets: u8,
    pub coverage: u8,
    pub recency: f64,
}

impl ScoreDigits {
    pub fn total(&self) -> f64 {
        10_000.0 * f64::from(self.profile)
            + 1_000.0 * f64::from(self.scope)
            + 100.0 * f64::from(self.method)
            + 10.0 * f64::from(self.targets)
            + f64::from(self.coverage)
            + self.recency
    }
}

/// Score plus the anomalies hit while computing it
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub score: f64,
    pub digits: ScoreDigits,
    pub diagnostics: SmallVec<[Diagnostic; 2]>,
}

/// Computes composite ordering keys
#[derive(Debug, Clone, Default)]
pub struct ScoreCalculator {
    scopes: ScopePriorityTable,
}

impl ScoreCalculator {
    pub fn new(scopes: ScopePriorityTable) -> Self {
        Self { scopes }
    }

    pub fn scope_table(&self) -> &ScopePriorityTable {
        &self.scopes
    }

    pub fn score(&self, input: &ScoreInput<'_>) -> ScoreOutcome {
        let mut diagnostics = SmallVec::new();

        let profile = profile_priority(input.profile);

        let scope = match self.scopes.lookup(input.simple_scope) {
            PriorityLookup::Known(p) => p,
            PriorityLookup::Fallback(p) => {
                diagnostics.push(Diagnostic::UnknownScopeCode {
                    account_id: input.account_id.to_string(),
                    code: input.simple_scope.to_string(),
                    fallback: p,
                });
                p
            }
        };

        let method = match method_priority(input.accounting_method) {
            PriorityLookup::Known(p) => p,
            PriorityLookup::Fallback(p) => {
                diagnostics.push(Diagnostic::UnclassifiableAccountingMethod {
                    account_id: input.account_id.to_string(),
                    full_scope: input.full_scope.to_string(),
                    fallback: p,
                });
                p
            }
        };

        let targets = match target_count_priority(input.target_count) {
            PriorityLookup::Known(p) => p,
            PriorityLookup::Fallback(p) => {
                diagnostics.push(Diagnostic::InvalidTargetCount {
                    account_id: input.account_id.to_string(),
                    profile: input.profile.code(),
                    target_count: input.target_count,
                    fallback: p,
                });
                p
            }
        };

        let coverage = match coverage_priority(input.coverage_percent) {
            PriorityLookup::Known(p) => p,
            PriorityLookup::Fallback(p) => {
                diagnostics.push(Diagnostic::InvalidCoverage {
                    account_id: input.account_id.to_string(),
                    value: input.coverage_percent,
                    digit: p,
                });
                p
            }
        };

        let recency = match input.base_year {
            Some(year) => f64::from(year) / BASE_YEAR_DIVISOR,
            None => {
                diagnostics.push(Diagnostic::MissingBaseYear {
                    account_id: input.account_id.to_string(),
                });
                0.0
            }
        };

        let digits = ScoreDigits { profile, scope, method, targets, coverage, recency };

        ScoreOutcome {
            score: digits.total(),
            digits,
            diagnostics,
        }
    }
}

fn profile_priority(profile: Profile) -> u8 {
    match profile {
        Profile::SequentialTargets => 9,
        Profile::SingleTarget => 8,
        Profile::Unclassified => 7,
        Profile::Other(_) => 0,
    }
}

fn method_priority(method: AccountingMethod) -> PriorityLookup {
    match method {
        AccountingMethod::LocationBased => PriorityLookup::Known(9),
        AccountingMethod::MarketBased => PriorityLookup::Known(8),
        AccountingMethod::Scope1Only => PriorityLookup::Known(7),
        AccountingMethod::Unclassified => PriorityLookup::Fallback(METHOD_FALLBACK),
    }
}

/// Fewer targets rank higher: 1 target → 9, 9 targets → 1
fn target_count_priority(target_count: u32) -> PriorityLookup {
    if (1..=9).contains(&target_count) {
        PriorityLookup::Known((10 - target_count) as u8)
    } else {
        PriorityLookup::Fallback(TARGET_COUNT_FALLBACK)
    }
}

/// `floor(0.9 * percent / 10)`; 100% maps to 9, 99% to 8
fn coverage_priority(coverage_percent: Option<f64>) -> PriorityLookup {
    match coverage_percent {
        Some(pct) if pct.is_finite() => {
            let digit = (0.9 * pct / 10.0).floor();
            if (0.0..=9.0).contains(&digit) && pct <= 100.0 {
                PriorityLookup::Known(digit as u8)
            } else {
                PriorityLookup::Fallback(digit.clamp(0.0, 9.0) as u8)
            }
        }
        _ => PriorityLookup::Fallback(0),
    }
}
