//! Dataset Reconciliation
//!
//! Recombines the kept duplicates with the records that never had a
//! duplicate. The unioned table is outer-joined with the kept account ids:
//!
//! - left only: no duplicate resolution needed, record goes to the final table
//! - both: original rows of a resolved duplicate group, replaced by the kept row
//! - right only: a kept id with no origin, which should never happen
//!
//! The final table is the left-only rows followed by the kept rows. Count and
//! uniqueness checks run afterwards; failures are integrity warnings, the
//! result is still returned.

use crate::dedup::ranker::ScoredCandidate;
use crate::diagnostics::MergeIssue;
use crate::record::CandidateRecord;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Which side of the outer join a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeSide {
    LeftOnly,
    Both,
    RightOnly,
}

impl MergeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeSide::LeftOnly => "left_only",
            MergeSide::Both => "both",
            MergeSide::RightOnly => "right_only",
        }
    }
}

/// Outcome of recombining one year
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Unioned rows whose account has no kept duplicate
    pub left_only: Vec<CandidateRecord>,
    /// Unioned rows whose account was resolved
    pub both: Vec<CandidateRecord>,
    /// Kept rows whose account is missing from the unioned table
    pub right_only: Vec<CandidateRecord>,
    /// Canonical output for the year
    pub final_records: Vec<CandidateRecord>,
    pub issues: Vec<MergeIssue>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Merge kept duplicates back into the unioned table
///
/// `singleton_count` is the grouper's count, used to cross-check the join.
pub fn reconcile(
    unioned: &[CandidateRecord],
    kept: &[&ScoredCandidate],
    singleton_count: usize,
) -> Reconciliation {
    let kept_ids: FxHashSet<&str> = kept.iter().map(|c| c.record.account_id.as_str()).collect();
    let unioned_ids: FxHashSet<&str> = unioned.iter().map(|r| r.account_id.as_str()).collect();

    let mut left_only = Vec::new();
    let mut both = Vec::new();
    for record in unioned {
        if kept_ids.contains(record.account_id.as_str()) {
            both.push(record.clone());
        } else {
            left_only.push(record.clone());
        }
    }

    let mut issues = Vec::new();

    let right_only: Vec<CandidateRecord> = kept
        .iter()
        .filter(|c| !unioned_ids.contains(c.record.account_id.as_str()))
        .map(|c| c.record.clone())
        .collect();
    for record in &right_only {
        issues.push(MergeIssue::KeptWithoutOrigin {
            account_id: record.account_id.clone(),
        });
    }

    let mut final_records = left_only.clone();
    final_records.extend(kept.iter().map(|c| c.record.clone()));

    if left_only.len() != singleton_count {
        issues.push(MergeIssue::SingletonCountMismatch {
            left_only: left_only.len(),
            singletons: singleton_count,
        });
    }

    let expected = singleton_count + kept.len();
    if final_records.len() != expected {
        issues.push(MergeIssue::RowCountMismatch {
            expected,
            actual: final_records.len(),
            singletons: singleton_count,
            kept: kept.len(),
        });
    }

    let mut occurrences: FxHashMap<&str, usize> = FxHashMap::default();
    for record in &final_records {
        *occurrences.entry(record.account_id.as_str()).or_insert(0) += 1;
    }
    let mut repeated: Vec<(&str, usize)> = occurrences
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    repeated.sort_unstable();
    for (account_id, count) in repeated {
        issues.push(MergeIssue::DuplicateInFinal {
            account_id: account_id.to_string(),
            count,
        });
    }

    Reconciliation {
        left_only,
        both,
        right_only,
        final_records,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::grouper::group_duplicates;
    use crate::dedup::ranker::rank_duplicates;
    use crate::diagnostics::DiagnosticsContext;
    use crate::record::Profile;
    use crate::scoring::ScoreCalculator;

    fn record(id: &str, profile: i64) -> CandidateRecord {
        CandidateRecord::new(id, Profile::from_code(profile), "Scope 1", "S1")
            .with_base_year(2020)
            .with_coverage(90.0)
            .with_target_years(&[2030])
    }

    fn resolve(unioned: &[CandidateRecord]) -> (Reconciliation, usize) {
        let partition = group_duplicates(unioned);
        let mut ctx = DiagnosticsContext::new();
        let ranked = rank_duplicates(&partition, &ScoreCalculator::default(), 2020, &mut ctx);
        let kept = ranked.kept();
        (reconcile(unioned, &kept, partition.singletons.len()), partition.singletons.len())
    }

    #[test]
    fn test_final_is_singletons_then_kept() {
        let unioned = vec![record("A", 1), record("B", 1), record("A", 2), record("C", 4)];
        let (result, singletons) = resolve(&unioned);

        assert!(result.is_consistent(), "{:?}", result.issues);
        assert_eq!(singletons, 2);
        assert_eq!(result.left_only.len(), 2);
        assert_eq!(result.both.len(), 2);
        assert!(result.right_only.is_empty());

        let ids: Vec<&str> = result.final_records.iter().map(|r| r.account_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C", "A"]);
        assert_eq!(result.final_records[2].profile, Profile::SequentialTargets);
    }

    #[test]
    fn test_no_duplicates_final_equals_singletons() {
        let unioned = vec![record("A", 1), record("B", 2)];
        let (result, _) = resolve(&unioned);

        assert!(result.is_consistent());
        assert!(result.both.is_empty());
        assert_eq!(result.final_records, unioned);
    }

    #[test]
    fn test_kept_without_origin_is_reported() {
        let unioned = vec![record("A", 1)];
        let mut ctx = DiagnosticsContext::new();
        let foreign = vec![record("Z", 1), record("Z", 2)];
        let ranked = rank_duplicates(&group_duplicates(&foreign), &ScoreCalculator::default(), 2020, &mut ctx);
        let kept = ranked.kept();

        let result = reconcile(&unioned, &kept, 1);

        assert_eq!(result.right_only.len(), 1);
        assert!(result.issues.contains(&MergeIssue::KeptWithoutOrigin { account_id: "Z".to_string() }));
        assert_eq!(result.final_records.len(), 2);
    }

    #[test]
    fn test_count_mismatch_is_reported() {
        let unioned = vec![record("A", 1), record("B", 1)];
        let result = reconcile(&unioned, &[], 1);

        assert!(result
            .issues
            .iter()
            .any(|i| matches!(i, MergeIssue::SingletonCountMismatch { left_only: 2, singletons: 1 })));
        assert!(result
            .issues
            .iter()
            .any(|i| matches!(i, MergeIssue::RowCountMismatch { expected: 1, actual: 2, .. })));
    }

    #[test]
    fn test_duplicate_in_final_is_reported() {
        // Feeding the raw unioned table without grouping leaves both "A" rows on the left
        let unioned = vec![record("A", 1), record("A", 2)];
        let result = reconcile(&unioned, &[], 2);

        assert!(result
            .issues
            .contains(&MergeIssue::DuplicateInFinal { account_id: "A".to_string(), count: 2 }));
    }
}
