//! Simple Scope Priority Table
//!
//! Maps the coarse scope code of a target to a priority digit (higher wins):
//!
//! | code     | priority |
//! |----------|----------|
//! | `S1S2`   | 9        |
//! | `S1S2S3` | 8        |
//! | `S1`     | 7        |
//! | `S1S3`   | 6        |
//! | `S2`     | 5        |
//! | `S2S3`   | 4        |
//!
//! Codes outside the table fall back to the maximum priority so that an
//! unexpected scope is never silently ranked below the known ones.

use rustc_hash::FxHashMap;

const SIMPLE_SCOPE_PRIORITIES: [(&str, u8); 6] = [
    ("S1S2", 9),
    ("S1S2S3", 8),
    ("S1", 7),
    ("S1S3", 6),
    ("S2", 5),
    ("S2S3", 4),
];

/// Result of a priority lookup: either a table hit or a substituted fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityLookup {
    Known(u8),
    Fallback(u8),
}

impl PriorityLookup {
    pub fn value(&self) -> u8 {
        match self {
            PriorityLookup::Known(v) | PriorityLookup::Fallback(v) => *v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PriorityLookup::Fallback(_))
    }
}

/// Simple scope code → priority digit
#[derive(Debug, Clone)]
pub struct ScopePriorityTable {
    priorities: FxHashMap<&'static str, u8>,
    fallback: u8,
}

impl ScopePriorityTable {
    /// The six known codes with priorities 9 (S1S2) down to 4 (S2S3)
    pub fn standard() -> Self {
        let priorities = SIMPLE_SCOPE_PRIORITIES.iter().copied().collect::<FxHashMap<_, _>>();
        let fallback = SIMPLE_SCOPE_PRIORITIES
            .iter()
            .map(|(_, p)| *p)
            .max()
            .unwrap_or(9);

        Self { priorities, fallback }
    }

    pub fn lookup(&self, simple_scope: &str) -> PriorityLookup {
        match self.priorities.get(simple_scope) {
            Some(priority) => PriorityLookup::Known(*priority),
            None => PriorityLookup::Fallback(self.fallback),
        }
    }

    pub fn contains(&self, simple_scope: &str) -> bool {
        self.priorities.contains_key(simple_scope)
    }

    /// Known codes, highest priority first
    pub fn codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<(&'static str, u8)> =
            self.priorities.iter().map(|(code, p)| (*code, *p)).collect();
        codes.sort_by(|a, b| b.1.cmp(&a.1));
        codes.into_iter().map(|(code, _)| code).collect()
    }
}

impl Default for ScopePriorityTable {
    fn default() -> Self {
        Self::standard()
    }
}
