//! Descending rank statistics within a group
//!
//! Ranks are 1-based; the highest value gets rank 1. Tie handling follows the
//! usual data-frame conventions:
//!
//! | field     | tied values receive                                   |
//! |-----------|-------------------------------------------------------|
//! | `average` | mean of the positions they occupy (e.g. 1.5)          |
//! | `min`     | lowest position of the tie block                      |
//! | `max`     | highest position of the tie block                     |
//! | `first`   | distinct positions in encounter order                 |

/// All four rank statistics for one value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranks {
    pub average: f64,
    pub min: u32,
    pub max: u32,
    pub first: u32,
}

/// Positions of `values` sorted descending; ties keep encounter order
fn descending_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // sort_by is stable, so equal values stay in encounter order
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    order
}

/// Compute every rank statistic in one pass over the sorted order
pub fn rank_all_descending(values: &[f64]) -> Vec<Ranks> {
    let order = descending_order(values);
    let mut ranks = vec![
        Ranks { average: 0.0, min: 0, max: 0, first: 0 };
        values.len()
    ];

    let mut block_start = 0;
    while block_start < order.len() {
        let lead = values[order[block_start]];
        let mut block_end = block_start + 1;
        while block_end < order.len() && values[order[block_end]] == lead {
            block_end += 1;
        }

        let min = block_start as u32 + 1;
        let max = block_end as u32;
        let average = (f64::from(min) + f64::from(max)) / 2.0;

        for (offset, &idx) in order[block_start..block_end].iter().enumerate() {
            ranks[idx] = Ranks {
                average,
                min,
                max,
                first: min + offset as u32,
            };
        }

        block_start = block_end;
    }

    ranks
}
