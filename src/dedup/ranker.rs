//! Duplicate Ranking
//!
//! Scores every member of every duplicate group and ranks scores within the
//! group, highest first. Four rank columns are kept for the audit table:
//!
//! - `avg_rank`: ties share the mean position; an exact two-way tie at the
//!   top shows up as 1.5 and is surfaced for manual review
//! - `min_rank`, `max_rank`: bounds of the tie block
//! - `rank`: first-seen rank, a strict order that picks the kept record

use crate::dedup::grouper::{DuplicateGroup, DuplicatePartition};
use crate::diagnostics::DiagnosticsContext;
use crate::record::CandidateRecord;
use crate::scoring::{ScoreCalculator, ScoreDigits, ScoreInput};
use crate::utils::rank::rank_all_descending;
use serde::Serialize;

/// Average rank produced by exactly two records tied for first place
pub const AMBIGUOUS_TIE_RANK: f64 = 1.5;

/// Outcome of one record within its duplicate group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Unique best record of its group
    Kept,
    /// One of exactly two records sharing the top score
    AmbiguousTie,
    /// Strictly dominated
    Removed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Kept => "kept",
            Outcome::AmbiguousTie => "ambiguous_tie",
            Outcome::Removed => "removed",
        }
    }
}

/// A duplicate record with its score and rank statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub record: CandidateRecord,
    pub nr_targets: u32,
    pub score: f64,
    pub digits: ScoreDigits,
    pub avg_rank: f64,
    pub min_rank: u32,
    pub max_rank: u32,
    /// First-seen rank within the group
    pub rank: u32,
}

impl ScoredCandidate {
    pub fn is_kept(&self) -> bool {
        self.rank == 1
    }

    pub fn is_removed(&self) -> bool {
        f64::from(self.rank) > AMBIGUOUS_TIE_RANK
    }

    pub fn is_ambiguous_tie(&self) -> bool {
        self.avg_rank == AMBIGUOUS_TIE_RANK
    }

    /// Single class per record: ambiguous ties first, then kept, else removed
    pub fn outcome(&self) -> Outcome {
        if self.is_ambiguous_tie() {
            Outcome::AmbiguousTie
        } else if self.is_kept() {
            Outcome::Kept
        } else {
            Outcome::Removed
        }
    }
}

/// Scored duplicates of one year, in group order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedDuplicates {
    pub scored: Vec<ScoredCandidate>,
}

impl RankedDuplicates {
    /// rank == 1: one record per group, including the winner of a tie
    pub fn kept(&self) -> Vec<&ScoredCandidate> {
        self.scored.iter().filter(|c| c.is_kept()).collect()
    }

    /// rank > 1.5
    pub fn removed(&self) -> Vec<&ScoredCandidate> {
        self.scored.iter().filter(|c| c.is_removed()).collect()
    }

    /// avg_rank == 1.5
    pub fn ambiguous(&self) -> Vec<&ScoredCandidate> {
        self.scored.iter().filter(|c| c.is_ambiguous_tie()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scored.is_empty()
    }
}

/// Score and rank every duplicate group of a year
pub fn rank_duplicates(
    partition: &DuplicatePartition,
    calculator: &ScoreCalculator,
    year: i32,
    diagnostics: &mut DiagnosticsContext,
) -> RankedDuplicates {
    let mut scored = Vec::with_capacity(partition.duplicate_count());

    for group in &partition.groups {
        scored.extend(rank_group(group, calculator, year, diagnostics));
    }

    RankedDuplicates { scored }
}

fn rank_group(
    group: &DuplicateGroup,
    calculator: &ScoreCalculator,
    year: i32,
    diagnostics: &mut DiagnosticsContext,
) -> Vec<ScoredCandidate> {
    let mut partial = Vec::with_capacity(group.members.len());

    for record in &group.members {
        let nr_targets = record.nr_targets();
        let outcome = calculator.score(&ScoreInput::from_record(record, nr_targets));
        for diagnostic in outcome.diagnostics {
            diagnostics.report(year, diagnostic);
        }
        partial.push((record, nr_targets, outcome.score, outcome.digits));
    }

    let scores: Vec<f64> = partial.iter().map(|(_, _, score, _)| *score).collect();
    let ranks = rank_all_descending(&scores);

    let candidates: Vec<ScoredCandidate> = partial
        .into_iter()
        .zip(ranks)
        .map(|((record, nr_targets, score, digits), ranks)| ScoredCandidate {
            record: record.clone(),
            nr_targets,
            score,
            digits,
            avg_rank: ranks.average,
            min_rank: ranks.min,
            max_rank: ranks.max,
            rank: ranks.first,
        })
        .collect();

    if candidates.iter().any(|c| c.is_ambiguous_tie()) {
        tracing::debug!(year, account_id = %group.account_id, "two candidates tie for first place");
    }

    candidates
}
