//! Data-Quality Diagnostics
//!
//! Nothing a single record does can abort a year: every anomaly degrades to a
//! fallback value and lands here instead. A `DiagnosticsContext` is owned by
//! one year run; contexts are merged in year order at the end of a run.

use crate::scoring::ScopePriorityTable;
use serde::Serialize;
use std::collections::BTreeSet;

/// Integrity problems found while recombining kept duplicates with singletons
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum MergeIssue {
    #[error("kept record for account '{account_id}' has no origin in the unioned table")]
    KeptWithoutOrigin { account_id: String },

    #[error("final table has {actual} rows, expected {expected} ({singletons} singletons + {kept} kept duplicates)")]
    RowCountMismatch {
        expected: usize,
        actual: usize,
        singletons: usize,
        kept: usize,
    },

    #[error("{left_only} rows matched no kept duplicate but the grouper found {singletons} singletons")]
    SingletonCountMismatch { left_only: usize, singletons: usize },

    #[error("account '{account_id}' appears {count} times in the final table")]
    DuplicateInFinal { account_id: String, count: usize },
}

/// One reported anomaly
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("account '{account_id}': scope '{code}' does not exist, using priority {fallback}")]
    UnknownScopeCode {
        account_id: String,
        code: String,
        fallback: u8,
    },

    #[error("account '{account_id}': no market or location can be determined from '{full_scope}', using priority {fallback}")]
    UnclassifiableAccountingMethod {
        account_id: String,
        full_scope: String,
        fallback: u8,
    },

    #[error("account '{account_id}' (profile {profile}): number of targets {target_count} is not between 1 and 9, using priority {fallback}")]
    InvalidTargetCount {
        account_id: String,
        profile: i64,
        target_count: u32,
        fallback: u8,
    },

    #[error("account '{account_id}': coverage {value:?} is outside 0-100, using coverage digit {digit}")]
    InvalidCoverage {
        account_id: String,
        value: Option<f64>,
        digit: u8,
    },

    #[error("account '{account_id}': base year is missing, recency tiebreak set to 0")]
    MissingBaseYear { account_id: String },

    #[error("merge inconsistency: {0}")]
    MergeInconsistency(MergeIssue),
}

impl Diagnostic {
    /// Integrity issues make the whole year's output suspect
    pub fn is_integrity_issue(&self) -> bool {
        matches!(self, Diagnostic::MergeInconsistency(_))
    }
}

impl From<MergeIssue> for Diagnostic {
    fn from(issue: MergeIssue) -> Self {
        Diagnostic::MergeInconsistency(issue)
    }
}

/// A diagnostic tagged with the year it was raised in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearDiagnostic {
    pub year: i32,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

/// Status of one simple scope code against the priority table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeCheck {
    pub code: String,
    pub known: bool,
}

/// Append-only diagnostics for one or more year runs
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticsContext {
    issues: Vec<YearDiagnostic>,
    scopes_seen: BTreeSet<String>,
    simple_scopes_seen: BTreeSet<String>,
}

impl DiagnosticsContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an anomaly and emit it as a warning
    pub fn report(&mut self, year: i32, diagnostic: Diagnostic) {
        tracing::warn!(year, "{}", diagnostic);
        self.issues.push(YearDiagnostic { year, diagnostic });
    }

    /// Track the scope vocabulary observed in the input
    pub fn observe_scope(&mut self, full_scope: &str, simple_scope: &str) {
        if !self.scopes_seen.contains(full_scope) {
            self.scopes_seen.insert(full_scope.to_string());
        }
        if !self.simple_scopes_seen.contains(simple_scope) {
            self.simple_scopes_seen.insert(simple_scope.to_string());
        }
    }

    /// Fold another context (typically a later year) into this one
    pub fn merge(&mut self, other: DiagnosticsContext) {
        self.issues.extend(other.issues);
        self.scopes_seen.extend(other.scopes_seen);
        self.simple_scopes_seen.extend(other.simple_scopes_seen);
    }

    pub fn issues(&self) -> &[YearDiagnostic] {
        &self.issues
    }

    pub fn scopes_seen(&self) -> &BTreeSet<String> {
        &self.scopes_seen
    }

    pub fn simple_scopes_seen(&self) -> &BTreeSet<String> {
        &self.simple_scopes_seen
    }

    pub fn has_integrity_issues(&self) -> bool {
        self.issues.iter().any(|issue| issue.diagnostic.is_integrity_issue())
    }

    /// Compare every observed simple scope against the priority table
    pub fn scope_checks(&self, table: &ScopePriorityTable) -> Vec<ScopeCheck> {
        self.simple_scopes_seen
            .iter()
            .map(|code| ScopeCheck {
                code: code.clone(),
                known: table.contains(code),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_messages_name_offending_value() {
        let diag = Diagnostic::UnknownScopeCode {
            account_id: "A1".to_string(),
            code: "S4".to_string(),
            fallback: 9,
        };
        let msg = diag.to_string();
        assert!(msg.contains("S4"));
        assert!(msg.contains("A1"));
        assert!(!diag.is_integrity_issue());

        let merge: Diagnostic = MergeIssue::KeptWithoutOrigin { account_id: "B2".to_string() }.into();
        assert!(merge.is_integrity_issue());
        assert!(merge.to_string().contains("B2"));
    }

    #[test]
    fn test_merge_preserves_order_and_vocabulary() {
        let mut first = DiagnosticsContext::new();
        first.observe_scope("Scope 1", "S1");
        first.report(2019, Diagnostic::MissingBaseYear { account_id: "A".to_string() });

        let mut second = DiagnosticsContext::new();
        second.observe_scope("Scope 2 (market-based)", "S2");
        second.observe_scope("Scope 1", "S1");
        second.report(2020, Diagnostic::MissingBaseYear { account_id: "B".to_string() });

        first.merge(second);

        let years: Vec<i32> = first.issues().iter().map(|i| i.year).collect();
        assert_eq!(years, vec![2019, 2020]);
        assert_eq!(first.simple_scopes_seen().len(), 2);
        assert_eq!(first.scopes_seen().len(), 2);
        assert!(!first.has_integrity_issues());
    }

    #[test]
    fn test_scope_checks_flag_unknown_codes() {
        let mut ctx = DiagnosticsContext::new();
        ctx.observe_scope("Scope 1+2", "S1S2");
        ctx.observe_scope("Scope 4", "S4");

        let checks = ctx.scope_checks(&ScopePriorityTable::standard());
        assert_eq!(
            checks,
            vec![
                ScopeCheck { code: "S1S2".to_string(), known: true },
                ScopeCheck { code: "S4".to_string(), known: false },
            ]
        );
    }

    #[test]
    fn test_report_serializes_with_kind_tag() {
        let mut ctx = DiagnosticsContext::new();
        ctx.report(
            2021,
            MergeIssue::DuplicateInFinal { account_id: "C".to_string(), count: 2 }.into(),
        );
        let json = serde_json::to_value(ctx.issues()).unwrap();
        assert_eq!(json[0]["year"], 2021);
        assert_eq!(json[0]["kind"], "merge_inconsistency");
    }
}
