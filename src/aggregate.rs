//! Reduce stored records to per-direction counts and pick a dominant
//! direction deterministically.

use std::collections::BTreeMap;

use crate::models::{AnalysisRecord, Direction};

/// Count records per direction. Every recognized direction is present in the
/// result, zero-initialized, so callers always see the full distribution.
/// Order-independent; pure function of its input.
pub fn aggregate(records: &[AnalysisRecord]) -> BTreeMap<Direction, usize> {
    let mut counts: BTreeMap<Direction, usize> =
        Direction::ALL.iter().map(|direction| (*direction, 0)).collect();

    for record in records {
        if let Some(count) = counts.get_mut(&record.direction) {
            *count += 1;
        }
    }

    counts
}

/// The direction with the highest count. Ties resolve to the
/// lexicographically smallest label, so repeated calls (and other
/// implementations of the same rule) always agree. All-zero counts resolve
/// to the neutral label instead of an arbitrary enum member.
pub fn dominant(counts: &BTreeMap<Direction, usize>) -> Direction {
    let mut best: Option<(Direction, usize)> = None;

    for (&direction, &count) in counts {
        let better = match best {
            None => true,
            Some((best_direction, best_count)) => {
                count > best_count
                    || (count == best_count && direction.as_str() < best_direction.as_str())
            }
        };
        if better {
            best = Some((direction, count));
        }
    }

    match best {
        Some((direction, count)) if count > 0 => direction,
        _ => Direction::NEUTRAL,
    }
}
