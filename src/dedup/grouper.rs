//! Duplicate Grouping
//!
//! Splits a year's unioned records into duplicate groups (same `account_id`
//! two or more times) and singletons. Groups come out sorted by account id;
//! members and singletons keep their encounter order.

use crate::record::CandidateRecord;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// All records of one company within one year (size ≥ 2)
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub account_id: String,
    pub members: Vec<CandidateRecord>,
}

/// Result of grouping a unioned table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicatePartition {
    pub groups: Vec<DuplicateGroup>,
    pub singletons: Vec<CandidateRecord>,
}

impl DuplicatePartition {
    /// Number of records across all duplicate groups
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }

    /// All duplicate records, groups in account order
    pub fn duplicate_records(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.groups.iter().flat_map(|g| g.members.iter())
    }
}

pub fn group_duplicates(records: &[CandidateRecord]) -> DuplicatePartition {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for record in records {
        *counts.entry(record.account_id.as_str()).or_insert(0) += 1;
    }

    let mut grouped: BTreeMap<&str, Vec<CandidateRecord>> = BTreeMap::new();
    let mut singletons = Vec::new();

    for record in records {
        if counts[record.account_id.as_str()] > 1 {
            grouped
                .entry(record.account_id.as_str())
                .or_default()
                .push(record.clone());
        } else {
            singletons.push(record.clone());
        }
    }

    let groups = grouped
        .into_iter()
        .map(|(account_id, members)| DuplicateGroup {
            account_id: account_id.to_string(),
            members,
        })
        .collect();

    DuplicatePartition { groups, singletons }
}
